// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Round-trip throughput for both backends over a mixed object graph.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reftree::{
    BinaryDeserializer, BinarySerializer, FieldAttrs, FieldDescriptor, TypeRegistry, Value,
    YamlDeserializer, YamlSerializer,
};

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .build("BaseClassTest")
        .field("T1", "Int32")
        .field("T2", "Int32")
        .register()
        .expect("register BaseClassTest");
    registry
        .build("ChildClassTest")
        .base("BaseClassTest")
        .field("T3", "Int32")
        .field("T4", "Int32")
        .register()
        .expect("register ChildClassTest");
    registry
        .build("ContainerTest")
        .field("Number", "Int32")
        .field_attr("HexNumber", "Int32", FieldAttrs::HEX)
        .field_desc(
            FieldDescriptor::new("Vector", "BaseClassTest")
                .pointer()
                .sequence()
                .attrs(FieldAttrs::INLINE),
        )
        .pointer_map_field("Map", "Int8", "BaseClassTest")
        .register()
        .expect("register ContainerTest");
    registry
}

fn graph(registry: &TypeRegistry, elements: usize) -> Value {
    let mut value = registry.instantiate("ContainerTest").expect("instance");
    let obj = value.as_object_mut().expect("object");
    obj.set("Number", 50i32).set("HexNumber", 100i32);

    let mut vector = Vec::with_capacity(elements);
    let mut map = Vec::with_capacity(elements);
    for i in 0..elements as i32 {
        let type_name = if i % 2 == 0 { "ChildClassTest" } else { "BaseClassTest" };
        let mut element = registry.instantiate(type_name).expect("element");
        if let Some(e) = element.as_object_mut() {
            e.set("T1", i).set("T2", i + 1);
        }
        vector.push(element.clone());
        map.push((Value::I8(i as i8), element));
    }
    obj.set("Vector", Value::Seq(vector));
    obj.set("Map", Value::Map(map));
    value
}

fn bench_yaml(c: &mut Criterion) {
    let registry = registry();
    let value = graph(&registry, 64);

    c.bench_function("yaml_serialize_64", |b| {
        b.iter(|| {
            let mut ser = YamlSerializer::new(&registry);
            ser.serialize(black_box(&value), "ContainerTest").expect("serialize");
            black_box(ser.to_yaml())
        })
    });

    let mut ser = YamlSerializer::new(&registry);
    ser.serialize(&value, "ContainerTest").expect("serialize");
    let text = ser.to_yaml();

    c.bench_function("yaml_deserialize_64", |b| {
        b.iter(|| {
            let mut de = YamlDeserializer::from_str(&registry, black_box(&text));
            black_box(de.deserialize_ptr("ContainerTest").expect("deserialize"))
        })
    });
}

fn bench_binary(c: &mut Criterion) {
    let registry = registry();
    let value = graph(&registry, 64);

    c.bench_function("binary_serialize_64", |b| {
        b.iter(|| {
            let mut ser = BinarySerializer::new(&registry);
            ser.serialize(black_box(&value), "ContainerTest").expect("serialize");
            black_box(ser.into_bytes())
        })
    });

    let mut ser = BinarySerializer::new(&registry);
    ser.serialize(&value, "ContainerTest").expect("serialize");
    let bytes = ser.into_bytes();

    c.bench_function("binary_deserialize_64", |b| {
        b.iter(|| {
            let mut de = BinaryDeserializer::from_bytes(&registry, black_box(bytes.clone()));
            black_box(de.deserialize_ptr("ContainerTest").expect("deserialize"))
        })
    });
}

criterion_group!(benches, bench_yaml, bench_binary);
criterion_main!(benches);

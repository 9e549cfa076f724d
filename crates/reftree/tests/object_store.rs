// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File-backed save and load through the object store.

use reftree::{ObjectStore, StoreError, TypeRegistry, Value, YamlDeserializer};

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .build("GameObject")
        .field("Name", "String")
        .field("Health", "Int32")
        .register()
        .expect("register GameObject");
    registry
        .build("Enemy")
        .base("GameObject")
        .field("Damage", "Int32")
        .register()
        .expect("register Enemy");
    registry
}

fn enemy(registry: &TypeRegistry, name: &str, health: i32, damage: i32) -> Value {
    let mut value = registry.instantiate("Enemy").expect("instance");
    if let Some(obj) = value.as_object_mut() {
        obj.set("Name", name).set("Health", health).set("Damage", damage);
    }
    value
}

#[test]
fn save_and_load_one_object() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("goblin.yaml");

    let mut store = ObjectStore::new();
    store.add("goblin", enemy(&registry, "goblin", 30, 5));
    store.save_object(&registry, "goblin", &path).expect("save");

    let mut loaded = ObjectStore::new();
    let name = loaded
        .load_object(&registry, &path, "GameObject", None)
        .expect("load");
    assert_eq!(name, "goblin");

    let value = loaded.get("goblin").expect("object");
    let obj = value.as_object().expect("structured");
    // The root tag restored the derived type.
    assert_eq!(obj.type_name(), "Enemy");
    assert_eq!(obj.get("Damage").and_then(Value::as_i32), Some(5));
    assert_eq!(store.get("goblin"), loaded.get("goblin"));
}

#[test]
fn explicit_name_overrides_the_name_field() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("goblin.yaml");

    let mut store = ObjectStore::new();
    store.add("goblin", enemy(&registry, "goblin", 30, 5));
    store.save_object(&registry, "goblin", &path).expect("save");

    let mut loaded = ObjectStore::new();
    let name = loaded
        .load_object(&registry, &path, "GameObject", Some("boss"))
        .expect("load");
    assert_eq!(name, "boss");
    assert!(loaded.contains("boss"));
    assert!(!loaded.contains("goblin"));
}

#[test]
fn unnamed_object_is_refused() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("anon.yaml");

    let mut store = ObjectStore::new();
    store.add("anon", enemy(&registry, "", 1, 1));
    store.save_object(&registry, "anon", &path).expect("save");

    let mut loaded = ObjectStore::new();
    let err = loaded
        .load_object(&registry, &path, "GameObject", None)
        .expect_err("no name");
    assert!(matches!(err, StoreError::Unnamed));
    assert!(loaded.is_empty());
}

#[test]
fn load_collision_keeps_the_first_object() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("goblin.yaml");

    let mut store = ObjectStore::new();
    store.add("goblin", enemy(&registry, "goblin", 30, 5));
    store.save_object(&registry, "goblin", &path).expect("save");

    let err = store
        .load_object(&registry, &path, "GameObject", None)
        .expect_err("collision");
    assert!(matches!(err, StoreError::Duplicate(_)));
    assert_eq!(store.len(), 1);
}

#[test]
fn save_all_round_trips_in_order() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("level.yaml");

    let mut store = ObjectStore::new();
    store.add("goblin", enemy(&registry, "goblin", 30, 5));
    store.add("orc", enemy(&registry, "orc", 80, 12));
    store.add("rat", enemy(&registry, "rat", 5, 1));
    store.save_all(&registry, &path).expect("save");

    let mut loaded = ObjectStore::new();
    let names = loaded
        .load_all(&registry, &path, "GameObject")
        .expect("load");
    assert_eq!(names, vec!["goblin", "orc", "rat"]);
    assert_eq!(loaded.len(), 3);
    assert_eq!(
        loaded
            .get("orc")
            .and_then(Value::as_object)
            .and_then(|o| o.get("Health"))
            .and_then(Value::as_i32),
        Some(80)
    );
}

#[test]
fn adopts_objects_from_an_open_stream() {
    let registry = registry();
    let mut store = ObjectStore::new();
    let text = "\
--- !Enemy
Name: goblin
Health: 30
Damage: 5
--- !Enemy
Name: orc
Health: 80
Damage: 12
";
    let mut de = YamlDeserializer::from_str(&registry, text);
    let first = store.deserialize_object(&mut de, "GameObject").expect("first");
    let second = store.deserialize_object(&mut de, "GameObject").expect("second");
    assert_eq!(first, "goblin");
    assert_eq!(second, "orc");
    assert!(de.is_stream_ended());
}

// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Reaction protocol tests
//!
//! Logic chains, cascades across entities, function records and components
//! working together through the public API.

use entij::{
    filters, Cascade, EntijError, Entity, EntitySet, FunctionRecord, HashFunctionRecord,
    ListenerBundle, Logic, MapLogic, Reaction, Value, ValueKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_cascade_order_is_append_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let make = |name: &'static str| {
        let e = Entity::named(name);
        let sink = Arc::clone(&log);
        e.add_logic(move |e: &Entity, input: &Value| -> Option<Reaction> {
            sink.lock().unwrap().push(format!("{}:{:?}", e.name().unwrap_or("?"), input));
            None
        });
        e
    };
    let (a, b, c) = (make("a"), make("b"), make("c"));
    let source = Entity::named("source");
    let (ta, tb, tc) = (a.clone(), b.clone(), c.clone());
    source.add_logic(move |_: &Entity, _: &Value| {
        Reaction::new()
            .and_then_move(&tc, 1)
            .and_then(|r| r.and_then_move_each(vec![ta.clone(), tb.clone()], 2))
            .ok()
    });

    source.react("go").unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["c:Int(1)", "a:Int(2)", "b:Int(2)"]
    );
}

#[test]
fn test_direct_effects_precede_cascades_and_events() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let hero = Entity::named("hero");
    let door = Entity::named("door");

    let sink = Arc::clone(&order);
    hero.add_position_listener(move |_| sink.lock().unwrap().push("posit"));
    let sink = Arc::clone(&order);
    hero.add_state_listener(move |_| sink.lock().unwrap().push("state"));
    let sink = Arc::clone(&order);
    hero.add_property_listener(move |_| sink.lock().unwrap().push("props"));
    let sink = Arc::clone(&order);
    door.add_logic(move |_: &Entity, _: &Value| {
        sink.lock().unwrap().push("cascade");
        Some(Reaction::new())
    });

    let target = door.clone();
    hero.add_logic(move |_: &Entity, _: &Value| {
        Reaction::new()
            .posit(1)
            .state(1)
            .set("keys", 0)
            .unset("torch")
            .and_then_move(&target, "open")
            .ok()
    });

    let reaction = hero.react("enter").unwrap().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["posit", "state", "props", "cascade"]);
    assert!(matches!(&reaction.cascades()[0], Cascade::React { target, .. } if *target == door));
}

#[test]
fn test_cascade_error_surfaces_after_applied_effects() {
    let e = Entity::new();
    e.add_logic(|_: &Entity, _: &Value| {
        Some(Reaction::new().posit(3).and_then_call("missing", vec![]))
    });
    let err = e.react(true).unwrap_err();
    assert!(matches!(err, EntijError::FunctionNotFound(_)));
    assert_eq!(e.posit(), 3);
}

#[test]
fn test_map_logic_drives_state_machine() {
    const CLOSED: i64 = 0;
    const OPEN: i64 = 1;
    const LOCKED: i64 = 2;

    let door = Entity::named("door");
    door.add_logic(
        MapLogic::new()
            .map_when("open", |e: &Entity, _: &Value| e.state() == CLOSED, |_: &Entity, _: &Value| {
                Some(Reaction::new().state(OPEN))
            })
            .map_when("close", |e: &Entity, _: &Value| e.state() == OPEN, |_: &Entity, _: &Value| {
                Some(Reaction::new().state(CLOSED))
            })
            .map_when("lock", |e: &Entity, _: &Value| e.state() == CLOSED, |_: &Entity, _: &Value| {
                Some(Reaction::new().state(LOCKED))
            })
            .map_kind(ValueKind::Entity, |_: &Entity, key: &Value| {
                let key = key.get::<Entity>().ok()?;
                Some(Reaction::new().state(CLOSED).set("unlocked_by", &key))
            }),
    );

    assert!(door.react("open").unwrap().is_some());
    assert!(door.react("lock").unwrap().is_none());
    door.react("close").unwrap();
    door.react("lock").unwrap();
    assert_eq!(door.state(), LOCKED);
    assert!(door.react("open").unwrap().is_none());

    let key = Entity::named("key");
    door.react(&key).unwrap();
    assert_eq!(door.state(), CLOSED);
    assert_eq!(door.get_prop::<Entity>("unlocked_by").unwrap(), Some(key));
}

#[test]
fn test_function_record_chain_through_entity() {
    let base = Arc::new(HashFunctionRecord::new().define("greet", |e: &Entity, _: &[Value]| {
        Ok(Value::from(format!("hello from {}", e.name().unwrap_or("nobody"))))
    }));
    let specific = base.clone().child();
    specific
        .set_func(
            "double",
            Arc::new(|_: &Entity, args: &[Value]| -> entij::Result<Value> {
                let n = args.first().cloned().unwrap_or_default().get::<i64>()?;
                Ok(Value::Int(n * 2))
            }),
        )
        .unwrap();

    let e = Entity::named("npc");
    e.set_function_record(specific);
    assert_eq!(e.func("greet", &[]).unwrap(), Value::from("hello from npc"));
    assert_eq!(e.func("double", &[Value::Int(21)]).unwrap(), Value::Int(42));
    assert!(matches!(e.func("double", &[]), Err(EntijError::Cast { .. })));
    assert!(matches!(e.func("fly", &[]), Err(EntijError::FunctionNotFound(_))));
}

#[test]
fn test_shared_component_on_many_entities() {
    let moved = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&moved);
    let mover: Arc<dyn Logic> =
        Arc::new(|e: &Entity, _: &Value| Some(Reaction::new().posit(e.posit() + 1)));
    let bundle = ListenerBundle::new().on_position(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let crowd: EntitySet = (0..5).map(|i| Entity::with("p", i, 0)).collect();
    for e in &crowd {
        e.attach(&mover);
        e.attach(&bundle);
        e.react(Value::Bool(true)).unwrap();
    }
    assert_eq!(moved.load(Ordering::SeqCst), 5);
    assert_eq!(crowd.count(filters::at(1)), 1);
    assert_eq!(crowd.count(filters::at(0)), 0);
}

#[test]
fn test_property_bag_round_trip_through_reactions() {
    let e = Entity::new();
    e.put_props(HashMap::from([("hp".to_string(), Value::Int(10))]));
    e.add_logic(|e: &Entity, input: &Value| {
        let damage = input.get::<i64>().ok()?;
        let hp = e.get_prop::<i64>("hp").ok().flatten()?;
        let reaction = if hp > damage {
            Reaction::new().set("hp", hp - damage)
        } else {
            Reaction::new().unset("hp").state(-1)
        };
        Some(reaction)
    });

    e.react(4).unwrap();
    assert_eq!(e.get_prop::<i64>("hp").unwrap(), Some(6));
    e.react(6).unwrap();
    assert!(!e.has_prop("hp"));
    assert_eq!(e.state(), -1);
    assert!(e.react(1).unwrap().is_none());
}

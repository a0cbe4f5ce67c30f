//! Calling-convention filtering done by `#[service]`.

use rpcgate::{service, Gateway, Registry, Response, Service, StatusError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Zoo {
    name: String,
}

#[allow(dead_code, clippy::unused_self)]
#[service]
impl Zoo {
    pub fn name(&self) -> Result<String, StatusError> {
        Ok(self.name.clone())
    }

    #[rpc(rename = "count_animals")]
    pub fn census(&self, animals: HashMap<String, u32>) -> Result<u32, StatusError> {
        Ok(animals.values().sum())
    }

    #[rpc(skip)]
    pub fn internal(&self) -> Result<(), StatusError> {
        Ok(())
    }

    pub fn feed(&self, _food: &mut Vec<String>) -> anyhow::Result<()> {
        Ok(())
    }

    pub fn r#move(&self) {}

    pub fn constructor() -> Self {
        Zoo {
            name: String::new(),
        }
    }

    pub fn rename_zoo(&mut self, name: String) {
        self.name = name;
    }

    pub fn consume(self) -> Result<(), StatusError> {
        Ok(())
    }

    pub fn two_inputs(&self, a: i32, b: i32) -> Result<i32, StatusError> {
        Ok(a + b)
    }

    pub fn generic<T: Default>(&self) -> Result<(), StatusError> {
        Ok(())
    }

    pub fn opaque(&self, _input: impl Into<String>) -> Result<(), StatusError> {
        Ok(())
    }

    pub async fn later(&self) -> Result<(), StatusError> {
        Ok(())
    }

    pub fn bare(&self) -> u32 {
        1
    }

    pub fn tuple(&self) -> (u32, u32) {
        (1, 2)
    }

    pub(crate) fn crate_visible(&self) -> Result<(), StatusError> {
        Ok(())
    }

    fn private(&self) -> Result<(), StatusError> {
        Ok(())
    }
}

fn zoo_registry() -> Registry {
    Registry::build_with(
        Arc::new(Zoo {
            name: "city".into(),
        }),
        true,
    )
}

#[test]
fn test_admitted_methods() {
    let registry = zoo_registry();
    assert_eq!(registry.names(), vec!["CountAnimals", "Feed", "Move", "Name"]);
}

#[test]
fn test_exclusion_reasons() {
    let reasons: HashMap<String, &'static str> = Zoo::exclusions()
        .into_iter()
        .map(|e| (e.name().to_string(), e.reason()))
        .collect();

    let expect = [
        ("internal", "marked #[rpc(skip)]"),
        ("constructor", "associated function without a `&self` receiver"),
        ("rename_zoo", "receiver must be `&self`"),
        ("consume", "receiver must be `&self`"),
        ("two_inputs", "takes more than one input argument"),
        ("generic", "generic methods have no concrete input shape"),
        ("opaque", "input uses `impl Trait` and has no concrete shape"),
        ("later", "async methods are not dispatchable"),
        ("bare", "returns a single value that cannot carry an error"),
        ("tuple", "returns a single value that cannot carry an error"),
        ("crate_visible", "not public"),
        ("private", "not public"),
    ];
    for (name, reason) in expect {
        assert_eq!(reasons.get(name).copied(), Some(reason), "exclusion for {name}");
    }
    assert_eq!(reasons.len(), expect.len());
}

#[test]
fn test_rename_and_raw_identifiers() {
    let gateway = Gateway::new(Zoo {
        name: "city".into(),
    });
    let census = gateway.lookup("count-animals").unwrap();
    assert_eq!(census.declared_name(), "count_animals");
    assert!(gateway.lookup("census").is_none());

    let resp = gateway.dispatch(rpcgate::Request::new(
        "count_animals",
        json!({"lions": 2, "zebras": 5}),
    ));
    assert_eq!(resp, Response::new(200, 7));

    let resp = gateway.dispatch(rpcgate::Request::new("move", Value::Null));
    assert_eq!(resp, Response::new(200, Value::Null));
}

#[test]
fn test_mut_ref_input() {
    let gateway = Gateway::new(Zoo {
        name: "city".into(),
    });
    let resp = gateway.dispatch(rpcgate::Request::new("feed", json!(["hay"])));
    assert_eq!(resp, Response::new(200, Value::Null));
    let resp = gateway.dispatch(rpcgate::Request::new("feed", json!("hay")));
    assert_eq!(resp, Response::new(400, "Malformed Request Body"));
}

#[test]
fn test_receiver_state_is_visible() {
    let gateway = Gateway::new(Zoo {
        name: "city".into(),
    });
    let resp = gateway.dispatch(rpcgate::Request::new("name", Value::Null));
    assert_eq!(resp, Response::ok("city"));
}

pub struct Empty;

#[service]
impl Empty {}

#[test]
fn test_empty_service() {
    let registry = Registry::build(Arc::new(Empty));
    assert!(registry.is_empty());
    assert!(registry.exclusions().is_empty());
}

pub struct Twins;

#[allow(clippy::unused_self)]
#[service]
impl Twins {
    pub fn add_one(&self, n: i64) -> Result<i64, StatusError> {
        Ok(n + 1)
    }

    #[rpc(rename = "AddOne")]
    pub fn add_one_again(&self, n: i64) -> Result<i64, StatusError> {
        Ok(n + 100)
    }
}

#[test]
fn test_duplicate_canonical_name_keeps_first() {
    let gateway = Gateway::new(Twins);
    assert_eq!(gateway.methods(), vec!["AddOne"]);
    let resp = gateway.dispatch(rpcgate::Request::new("add-one", json!(1)));
    assert_eq!(resp, Response::new(200, 2));
    let dup = &gateway.registry().exclusions()[0];
    assert_eq!(dup.name(), "AddOne");
    assert_eq!(dup.reason(), "canonical name already registered");
}

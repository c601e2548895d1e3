//! Behavioural tests for dispatching against a registered service.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde::{Deserialize, Serialize};

use crate::{
    CallContext, Dispatcher, DomainError, MethodTable, Response, Service, ServiceRegistry,
};

#[derive(Deserialize)]
struct Reservation {
    sku: String,
    quantity: u32,
}

#[derive(Serialize)]
struct Reserved {
    sku: String,
    remaining: u32,
}

struct Inventory {
    stock: Mutex<HashMap<String, u32>>,
    calls: Arc<AtomicUsize>,
}

impl Inventory {
    fn reserve(&self, _ctx: &CallContext, request: Reservation) -> Result<Reserved, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut stock = self
            .stock
            .lock()
            .map_err(|_| DomainError::new(500, "stock unavailable"))?;
        let available = stock
            .get_mut(&request.sku)
            .ok_or_else(|| DomainError::new(404, "Unknown SKU"))?;
        if *available < request.quantity {
            return Err(DomainError::new(409, "Insufficient stock"));
        }
        *available -= request.quantity;
        Ok(Reserved {
            sku: request.sku,
            remaining: *available,
        })
    }

    fn forget(&self, _ctx: &CallContext, _request: Reservation) -> Result<(), DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Service for Inventory {
    const NAME: &'static str = "Inventory";

    fn methods(table: &mut MethodTable<Self>) {
        table
            .method("Reserve", Self::reserve)
            .method("Forget", Self::forget);
    }
}

#[derive(Default)]
struct DispatchWorld {
    dispatcher: Option<Dispatcher>,
    calls: Arc<AtomicUsize>,
    response: Option<Response>,
}

impl DispatchWorld {
    fn response(&self) -> &Response {
        self.response.as_ref().expect("a request was dispatched")
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::default())
}

#[given("a registry with the inventory service")]
fn given_inventory(world: &RefCell<DispatchWorld>) {
    let mut world = world.borrow_mut();
    let inventory = Inventory {
        stock: Mutex::new(HashMap::from([("A1".to_owned(), 10)])),
        calls: Arc::clone(&world.calls),
    };
    let registry = ServiceRegistry::builder()
        .register(inventory)
        .expect("register inventory")
        .build();
    world.dispatcher = Some(Dispatcher::new(Arc::new(registry)));
}

#[when(r#"method "{method}" of service "{service}" is dispatched with '{payload}'"#)]
fn when_dispatched(
    world: &RefCell<DispatchWorld>,
    method: String,
    service: String,
    payload: String,
) {
    let mut world = world.borrow_mut();
    let dispatcher = world.dispatcher.as_ref().expect("registry configured");
    let response = dispatcher.dispatch(
        &CallContext::new(),
        strip_quotes(&service),
        strip_quotes(&method),
        strip_quotes(&payload).as_bytes(),
    );
    world.response = Some(response);
}

#[then("the response status is {status}")]
fn then_status(world: &RefCell<DispatchWorld>, status: u16) {
    assert_eq!(world.borrow().response().status().code(), status);
}

#[then("the response body is '{body}'")]
fn then_body(world: &RefCell<DispatchWorld>, body: String) {
    let world = world.borrow();
    assert_eq!(
        world.response().body(),
        Some(strip_quotes(&body).as_bytes())
    );
}

#[then(r#"the response message is "{message}""#)]
fn then_message(world: &RefCell<DispatchWorld>, message: String) {
    assert_eq!(
        world.borrow().response().message(),
        Some(strip_quotes(&message))
    );
}

#[then("the response has no body")]
fn then_no_body(world: &RefCell<DispatchWorld>) {
    let world = world.borrow();
    assert_eq!(world.response().body(), None);
    assert_eq!(world.response().message(), None);
}

#[then("the method was invoked {count} times")]
fn then_invocations(world: &RefCell<DispatchWorld>, count: usize) {
    assert_eq!(world.borrow().calls.load(Ordering::SeqCst), count);
}

/// Strips surrounding quotes left by the step pattern.
fn strip_quotes(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

#[scenario(path = "tests/features/dispatch.feature")]
fn dispatch(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

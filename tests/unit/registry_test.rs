//! Tests for the capability registry

use std::sync::Arc;

use plugin_scheduler::core::{Capability, Registry};
use plugin_scheduler::eventengine::{Event, EventContext, EventHandler, HandlerType, NewEvent};
use plugin_scheduler::core::PluginError;

struct TypeHandler {
    name: &'static str,
    event_type: &'static str,
    order: i32,
}

struct Noop;

#[async_trait::async_trait]
impl EventHandler for Noop {
    async fn handle(&mut self, _ctx: &mut EventContext) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Capability<Event> for TypeHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, event: &Event) -> bool {
        event.event_type == self.event_type
    }

    fn order_key(&self) -> i32 {
        self.order
    }
}

impl HandlerType for TypeHandler {
    fn build(&self, _event: &Event) -> Box<dyn EventHandler> {
        Box::new(Noop)
    }
}

fn handler(name: &'static str, event_type: &'static str, order: i32) -> Arc<dyn HandlerType> {
    Arc::new(TypeHandler { name, event_type, order })
}

#[test]
fn test_applicable_handlers_sorted_by_order_key() {
    let registry = Registry::new(vec![
        handler("linkstate", "linkState", 10),
        handler("boxstate", "boxState", 5),
        handler("boxstate_late", "boxState", 20),
        handler("boxstate_early", "boxState", -1),
    ]);
    let event = NewEvent::new("eventEngine", "boxState").with_id(1, 0);

    let names: Vec<&str> = registry.applicable(&event).iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["boxstate_early", "boxstate", "boxstate_late"]);
}

#[test]
fn test_equal_order_keys_keep_registration_order() {
    let registry = Registry::new(vec![
        handler("first", "info", 0),
        handler("second", "info", 0),
    ]);
    let event = NewEvent::new("eventEngine", "info").with_id(1, 0);

    let names: Vec<&str> = registry.applicable(&event).iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_no_applicable_handlers() {
    let registry = Registry::new(vec![handler("linkstate", "linkState", 0)]);
    let event = NewEvent::new("eventEngine", "boxState").with_id(1, 0);
    assert!(registry.applicable(&event).is_empty());
    assert_eq!(registry.len(), 1);
}

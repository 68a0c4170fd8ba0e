//! Integration tests for lifecycle events and dispatcher configuration

use std::sync::{Arc, Mutex};

use ricecoder_events::*;

/// Records `(lifecycle event, observed event, subscriber kind)` triples
#[derive(Clone, Default)]
struct LifecycleRecorder {
    entries: Arc<Mutex<Vec<(String, String, HandlerKind)>>>,
}

impl LifecycleRecorder {
    fn attach(&self, dispatcher: &EventDispatcher) {
        let core = dispatcher.core_events().clone();

        let entries = self.entries.clone();
        dispatcher
            .subscribe(
                &core.subscriber_registered,
                Handler::sync(move |ctx: &mut EventContext<SubscriberRegisteredEvent, ()>| {
                    let payload = ctx.payload();
                    entries.lock().unwrap().push((
                        "registered".to_string(),
                        payload.event.name.clone(),
                        payload.subscriber.kind,
                    ));
                    Ok(None)
                }),
            )
            .unwrap();

        let entries = self.entries.clone();
        dispatcher
            .subscribe(
                &core.subscriber_removed,
                Handler::sync(move |ctx: &mut EventContext<SubscriberRemovedEvent, ()>| {
                    let payload = ctx.payload();
                    entries.lock().unwrap().push((
                        "removed".to_string(),
                        payload.event.name.clone(),
                        payload.subscriber.kind,
                    ));
                    Ok(None)
                }),
            )
            .unwrap();
    }

    fn entries(&self) -> Vec<(String, String, HandlerKind)> {
        self.entries.lock().unwrap().clone()
    }
}

#[test]
fn test_registration_and_removal_are_reported() {
    let dispatcher = EventDispatcher::new();
    let recorder = LifecycleRecorder::default();
    recorder.attach(&dispatcher);

    let event: EventDescriptor<String> = EventDescriptor::asynchronous("file_renamed");
    let subscription = dispatcher
        .subscribe(
            &event,
            Handler::asynchronous(|_ctx| Box::pin(async move { Ok(None) })),
        )
        .unwrap();
    assert!(subscription.unsubscribe());
    assert!(!subscription.unsubscribe());

    assert_eq!(
        recorder.entries(),
        vec![
            ("registered".to_string(), "file_renamed".to_string(), HandlerKind::Async),
            ("removed".to_string(), "file_renamed".to_string(), HandlerKind::Async),
        ]
    );
}

#[test]
fn test_clear_subscribers_reports_each_removal() {
    let dispatcher = EventDispatcher::new();
    let event: EventDescriptor<String> = EventDescriptor::sync("file_saved");
    dispatcher
        .subscribe(&event, Handler::sync(|_ctx| Ok(None)))
        .unwrap();
    dispatcher
        .subscribe(&event, Handler::sync(|_ctx| Ok(None)))
        .unwrap();

    let recorder = LifecycleRecorder::default();
    recorder.attach(&dispatcher);

    assert_eq!(dispatcher.clear_subscribers(&event), 2);
    assert_eq!(
        recorder.entries(),
        vec![
            ("removed".to_string(), "file_saved".to_string(), HandlerKind::Sync),
            ("removed".to_string(), "file_saved".to_string(), HandlerKind::Sync),
        ]
    );
}

#[test]
fn test_internal_event_subscriptions_are_not_reported() {
    let dispatcher = EventDispatcher::new();
    let recorder = LifecycleRecorder::default();
    recorder.attach(&dispatcher);

    let observer: Handler<AfterTriggerEvent> = Handler::sync(|_ctx| Ok(None));
    dispatcher
        .subscribe(&dispatcher.core_events().after_trigger, observer.clone())
        .unwrap();
    assert!(dispatcher.unsubscribe(&dispatcher.core_events().after_trigger, &observer));

    assert!(recorder.entries().is_empty());
}

#[test]
fn test_internal_descriptor_skips_trigger_notifications() {
    let dispatcher = EventDispatcher::new();
    let triggered = Arc::new(Mutex::new(Vec::new()));
    let triggered_clone = triggered.clone();
    dispatcher
        .subscribe(
            &dispatcher.core_events().before_trigger,
            Handler::sync(move |ctx: &mut EventContext<BeforeTriggerEvent, ()>| {
                triggered_clone
                    .lock()
                    .unwrap()
                    .push(ctx.payload().event.name.clone());
                Ok(None)
            }),
        )
        .unwrap();

    let hidden: EventDescriptor<()> = EventDescriptor::sync("plugin:internal").as_internal();
    let visible: EventDescriptor<()> = EventDescriptor::sync("plugin:visible");
    dispatcher.trigger(&hidden, (), TriggerOptions::new()).unwrap();
    dispatcher.trigger(&visible, (), TriggerOptions::new()).unwrap();

    assert_eq!(*triggered.lock().unwrap(), vec!["plugin:visible".to_string()]);
}

#[test]
fn test_after_trigger_sees_summary() {
    let dispatcher = EventDispatcher::new();
    let summaries = Arc::new(Mutex::new(Vec::new()));
    let summaries_clone = summaries.clone();
    dispatcher
        .subscribe(
            &dispatcher.core_events().after_trigger,
            Handler::sync(move |ctx: &mut EventContext<AfterTriggerEvent, ()>| {
                summaries_clone.lock().unwrap().push(ctx.payload().context.clone());
                Ok(None)
            }),
        )
        .unwrap();

    let event: EventDescriptor<String, usize> = EventDescriptor::sync("measured");
    dispatcher
        .subscribe(&event, Handler::sync(|ctx: &mut EventContext<String, usize>| Ok(Some(ctx.payload().len()))))
        .unwrap();
    let ctx = dispatcher
        .trigger(
            &event,
            "hello".to_string(),
            TriggerOptions::new().with_metadata(serde_json::json!({"source": "editor"})),
        )
        .unwrap();

    let summaries = summaries.lock().unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.invocation_id, ctx.invocation_id());
    assert_eq!(summary.payload_as::<String>(), Some(&"hello".to_string()));
    assert_eq!(summary.result_as::<usize>(), Some(&5));
    assert_eq!(summary.metadata["source"], "editor");
    assert!(summary.has_subscribers);
    assert!(!summary.stopped);
}

#[test]
fn test_dispatcher_from_yaml_config() {
    let config = DispatcherConfig::from_yaml("events:\n  include_core_events: false\n").unwrap();
    let dispatcher = EventDispatcher::with_config(config);

    assert!(dispatcher.list_events().is_empty());

    let event: EventDescriptor<()> = EventDescriptor::sync("standalone");
    dispatcher.trigger(&event, (), TriggerOptions::new()).unwrap();
    assert_eq!(dispatcher.list_events().len(), 1);
    assert!(!dispatcher.has_event(lifecycle::BEFORE_TRIGGER));
}

#[test]
fn test_list_events_is_sorted() {
    let dispatcher = EventDispatcher::new();
    for name in ["zeta", "alpha", "mid"] {
        let event: EventDescriptor<()> = EventDescriptor::sync(name);
        dispatcher.register_event(&event).unwrap();
    }

    let names: Vec<String> = dispatcher.list_events().into_iter().map(|e| e.name).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names.len(), 8);
}

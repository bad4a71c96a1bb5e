// Integration tests for topic-mediator
// These exercise the mediator, modules and worker pool together through the public API

use crossbeam_channel::{unbounded, Receiver};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use topic_mediator::module::PublishSchedule;
use topic_mediator::source::ScriptedSource;
use topic_mediator::strategy::{CompressorFactory, DispenserFactory, StrategyFactory, StrategyOutput};
use topic_mediator::{Mediator, Module, ModuleFactory, ModuleState, Value};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Factory whose modules never fail a fetch and publish slowly enough to stay out of the way
fn quiet_factory(mediator: &Mediator) -> ModuleFactory {
    ModuleFactory::new(mediator, Arc::new(ScriptedSource::constant(0))).with_schedule(
        PublishSchedule {
            interval: Duration::from_secs(60),
            topic: "randomInt".to_string(),
        },
    )
}

/// Route a module's notifications into a channel
fn capture(module: &Module) -> Receiver<(String, Value)> {
    let (tx, rx) = unbounded();
    module.set_notification_callback(move |topic, value| {
        let _ = tx.send((topic.to_string(), value.clone()));
    });
    rx
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + TIMEOUT;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_publish_reaches_subscriber() {
    let mediator = Mediator::new(2);
    let factory = quiet_factory(&mediator);
    let a = factory.create_module("A");
    let b = factory.create_module("B");
    mediator.register_module(a.clone());
    mediator.register_module(b.clone());
    let received = capture(&b);

    b.subscribe_to_topic("x", "A");
    assert!(wait_until(|| mediator.is_subscribed("B", "A", "x")));

    a.publish_to_topic("x", 42);
    assert_eq!(
        received.recv_timeout(TIMEOUT).unwrap(),
        ("x".to_string(), json!(42))
    );

    b.unsubscribe_from_topic("x", "A");
    assert!(wait_until(|| !mediator.is_subscribed("B", "A", "x")));

    a.publish_to_topic("x", 43);
    assert!(received.recv_timeout(Duration::from_millis(200)).is_err());

    mediator.shutdown();
}

#[test]
fn test_subscribe_before_publisher_exists() {
    let mediator = Mediator::new(2);
    let factory = quiet_factory(&mediator);
    let b = factory.create_module("B");
    mediator.register_module(b.clone());
    let received = capture(&b);

    b.subscribe_to_topic("x", "late");
    assert!(wait_until(|| mediator.is_subscribed("B", "late", "x")));

    let late = factory.create_module("late");
    mediator.register_module(late.clone());
    late.publish_to_topic("x", "hello");

    assert_eq!(
        received.recv_timeout(TIMEOUT).unwrap(),
        ("x".to_string(), json!("hello"))
    );
    mediator.shutdown();
}

#[test]
fn test_errored_module_is_silent() {
    let mediator = Mediator::new(2);
    let factory = quiet_factory(&mediator);
    let a = factory.create_module("A");
    let b = factory.create_module("B");
    mediator.register_module(a.clone());
    mediator.register_module(b.clone());
    let received = capture(&b);

    b.subscribe_to_topic("x", "A");
    assert!(wait_until(|| mediator.is_subscribed("B", "A", "x")));

    a.transition_to_running();
    a.mark_error();
    assert_eq!(a.state(), ModuleState::Error);

    // Nothing is enqueued while in Error
    a.publish_to_topic("x", 1);
    a.subscribe_to_topic("y", "B");
    thread::sleep(Duration::from_millis(100));
    assert!(received.try_recv().is_err());
    assert!(!mediator.is_subscribed("A", "B", "y"));

    // An errored subscriber is skipped by delivery
    b.transition_to_running();
    b.mark_error();
    assert_eq!(mediator.notify_subscribers("A", "x", &json!(2)), 0);
    assert!(received.try_recv().is_err());

    mediator.shutdown();
}

#[test]
fn test_reregister_restores_delivery() {
    let mediator = Mediator::new(2);
    let factory = quiet_factory(&mediator);
    let a = factory.create_module("A");
    let b = factory.create_module("B");
    mediator.register_module(a.clone());
    mediator.register_module(b.clone());
    let received = capture(&b);

    b.subscribe_to_topic("x", "A");
    assert!(wait_until(|| mediator.is_subscribed("B", "A", "x")));

    mediator.unregister_module("A").unwrap();
    assert!(mediator.get_module("A").is_none());
    a.publish_to_topic("x", 1);
    assert!(received.recv_timeout(Duration::from_millis(200)).is_err());

    // Subscriptions survive unregistration
    mediator.register_module(a.clone());
    a.publish_to_topic("x", 2);
    assert_eq!(
        received.recv_timeout(TIMEOUT).unwrap(),
        ("x".to_string(), json!(2))
    );

    assert!(mediator.unregister_module("missing").is_err());
    mediator.shutdown();
}

#[test]
fn test_background_publishing_and_recovery() {
    let mediator = Mediator::new(2);
    // First fetch fails, every later fetch yields 7
    let source = ScriptedSource::new(vec![None], Some(7));
    let factory = ModuleFactory::new(&mediator, Arc::new(source)).with_schedule(PublishSchedule {
        interval: Duration::from_millis(20),
        topic: "randomInt".to_string(),
    });
    let publisher = factory.create_module("P");
    let listener = quiet_factory(&mediator).create_module("L");
    mediator.register_module(publisher.clone());
    mediator.register_module(listener.clone());
    let received = capture(&listener);

    listener.subscribe_to_topic("randomInt", "P");
    assert!(wait_until(|| mediator.is_subscribed("L", "P", "randomInt")));

    publisher.transition_to_running();
    publisher.transition_to_running();
    assert!(wait_until(|| publisher.state() == ModuleState::Error));
    assert!(received.try_recv().is_err());

    publisher.resolve_error();
    assert_eq!(publisher.state(), ModuleState::Running);
    assert_eq!(
        received.recv_timeout(TIMEOUT).unwrap(),
        ("randomInt".to_string(), json!(7))
    );

    publisher.stop_background_process();
    assert!(wait_until(|| !publisher.has_background_task()));
    mediator.shutdown();
}

#[test]
fn test_concurrent_publishes_all_delivered() {
    let mediator = Mediator::new(4);
    let factory = quiet_factory(&mediator);
    let listener = factory.create_module("L");
    mediator.register_module(listener.clone());
    let received = capture(&listener);

    let publishers: Vec<Arc<Module>> = (0..4)
        .map(|i| {
            let module = factory.create_module(&format!("P{}", i));
            mediator.register_module(module.clone());
            listener.subscribe_to_topic("n", module.id());
            module
        })
        .collect();
    assert!(wait_until(|| mediator.subscription_count() == 4));

    let handles: Vec<_> = publishers
        .into_iter()
        .map(|module| {
            thread::spawn(move || {
                for n in 0..25 {
                    module.publish_to_topic("n", n);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut total = 0;
    while received.recv_timeout(TIMEOUT).is_ok() {
        total += 1;
        if total == 100 {
            break;
        }
    }
    assert_eq!(total, 100);
    mediator.shutdown();
}

#[test]
fn test_specialized_modules_run_strategies() {
    let mediator = Mediator::new(1);
    let factory = quiet_factory(&mediator);
    let compressor = factory.create_compressor_module("compressorModule", "Special value");
    let dispenser = factory
        .create_named("dispenser", "dispenserModule", Some(json!("abc")))
        .unwrap();
    mediator.register_module(compressor.clone());
    mediator.register_module(dispenser.clone());

    compressor
        .set_strategy(CompressorFactory.create_strategy("v4").unwrap())
        .unwrap();
    assert_eq!(
        compressor.execute().unwrap(),
        StrategyOutput::Bytes(b"eulav laicepS".to_vec())
    );

    dispenser
        .set_strategy(DispenserFactory.create_strategy("v2").unwrap())
        .unwrap();
    assert_eq!(
        dispenser.execute().unwrap(),
        StrategyOutput::Text(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string()
        )
    );

    assert!(CompressorFactory.create_strategy("v9").is_err());
    mediator.shutdown();
}

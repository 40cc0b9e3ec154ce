//! Process compatibility decisions across runtime versions.

use std::sync::Arc;
use std::thread;

use lios::compat::{
    CompatError, CompatibilityController, ProcessContext, ProcessRuntime, RuntimeVersion,
    StartMethod, StartMethodError, WorkaroundPolicy,
};

fn controller_for(context: ProcessContext) -> (Arc<ProcessContext>, CompatibilityController) {
    let context = Arc::new(context);
    let controller = CompatibilityController::new(context.clone(), WorkaroundPolicy::default());
    (context, controller)
}

#[test]
fn unaffected_runtime_needs_nothing() {
    let (context, controller) = controller_for(ProcessContext::new(RuntimeVersion::new(3, 13, 0)));

    assert!(controller.initialize(false).is_ok());
    let status = controller.status();
    assert!(!status.needs_workaround);
    assert!(status.compatible);
    assert!(status.initialized);
    assert_eq!(context.start_method(), None);
}

#[cfg(unix)]
#[test]
fn affected_runtime_switches_to_fork() {
    let (context, controller) = controller_for(ProcessContext::new(RuntimeVersion::new(3, 14, 0)));

    assert!(controller.initialize(false).is_ok());
    let status = controller.status();
    assert!(status.needs_workaround);
    assert!(status.compatible);
    assert_eq!(status.active_method, Some(StartMethod::Fork));
    assert_eq!(context.start_method(), Some(StartMethod::Fork));
}

#[test]
fn method_fixed_elsewhere_is_reported_not_raised() {
    let (_, controller) = controller_for(ProcessContext::with_method(
        RuntimeVersion::new(3, 14, 0),
        StartMethod::Spawn,
    ));

    assert!(controller.initialize(false).is_ok());
    let status = controller.status();
    assert!(status.initialized);
    assert!(!status.compatible);
    assert_eq!(status.active_method, Some(StartMethod::Spawn));
}

#[cfg(unix)]
#[test]
fn force_rederives_over_existing_method() {
    let (_, controller) = controller_for(ProcessContext::with_method(
        RuntimeVersion::new(3, 14, 2),
        StartMethod::Spawn,
    ));

    controller.initialize(false).unwrap();
    assert!(!controller.is_compatible());

    controller.initialize(true).unwrap();
    let status = controller.status();
    assert!(status.compatible);
    assert_eq!(status.active_method, Some(StartMethod::Fork));
}

#[test]
fn force_against_committed_context_fails_without_initializing() {
    let (context, controller) = controller_for(ProcessContext::with_method(
        RuntimeVersion::new(3, 14, 0),
        StartMethod::Spawn,
    ));
    context.commit();

    let err = controller.initialize(true).unwrap_err();
    match err {
        CompatError::DerivationFailed { requested, source } => {
            assert_eq!(requested, StartMethod::Fork);
            // Non-unix platforms refuse fork before looking at the context.
            assert!(matches!(
                source,
                StartMethodError::Committed(StartMethod::Spawn) | StartMethodError::Unsupported(_)
            ));
        }
    }
    assert!(!controller.is_initialized());
    assert!(!controller.is_compatible());

    // The non-forced path absorbs the same refusal.
    assert!(controller.initialize(false).is_ok());
    assert!(controller.is_initialized());
}

#[test]
fn custom_threshold_moves_the_boundary() {
    let context = Arc::new(ProcessContext::new(RuntimeVersion::new(3, 14, 0)));
    let controller = CompatibilityController::new(
        context.clone(),
        WorkaroundPolicy::new(RuntimeVersion::new(3, 15, 0)),
    );

    controller.initialize(false).unwrap();
    assert!(!controller.needs_workaround());
    assert!(controller.is_compatible());
    assert_eq!(context.start_method(), None);
}

#[test]
fn concurrent_initialize_agrees() {
    let (_, controller) = controller_for(ProcessContext::new(RuntimeVersion::new(3, 14, 0)));
    let controller = Arc::new(controller);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || {
                controller.initialize(false).unwrap();
                controller.status()
            })
        })
        .collect();

    let statuses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(statuses.iter().all(|s| *s == statuses[0]));
    assert!(statuses[0].initialized);
}

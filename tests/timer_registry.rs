use std::time::Duration;

use voicedm::kernel::effect::SideEffect;
use voicedm::kernel::timer::{TimerName, TimerRegistry};

#[test]
fn test_rearm_leaves_one_live_timer() {
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();

    let first = timers.arm(TimerName::NoInput, Duration::from_secs(5), &mut fx);
    let second = timers.arm(TimerName::NoInput, Duration::from_secs(5), &mut fx);

    assert_eq!(timers.live_count(), 1);
    assert_ne!(first, second);
    assert_eq!(
        fx,
        vec![
            SideEffect::ArmTimer { handle: first, delay: Duration::from_secs(5) },
            SideEffect::CancelTimer { handle: first },
            SideEffect::ArmTimer { handle: second, delay: Duration::from_secs(5) },
        ]
    );

    assert!(!timers.fire(first), "superseded timer never fires");
    assert!(timers.fire(second));
    assert!(!timers.fire(second), "a timer fires at most once");
}

#[test]
fn test_cancelled_timer_never_fires() {
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();

    let handle = timers.arm(TimerName::CompleteTimeout, Duration::from_millis(300), &mut fx);
    assert!(timers.cancel(TimerName::CompleteTimeout, &mut fx));
    assert!(!timers.cancel(TimerName::CompleteTimeout, &mut fx));
    assert!(!timers.fire(handle));
}

#[test]
fn test_names_are_independent() {
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();

    let no_input = timers.arm(TimerName::NoInput, Duration::from_secs(5), &mut fx);
    timers.arm(TimerName::PassivityRetry, Duration::from_secs(1), &mut fx);
    assert_eq!(timers.live_count(), 2);

    timers.cancel(TimerName::PassivityRetry, &mut fx);
    assert!(timers.is_live(TimerName::NoInput));
    assert!(timers.fire(no_input));
}

#[test]
fn test_cancel_all() {
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();
    timers.arm(TimerName::NoInput, Duration::from_secs(5), &mut fx);
    timers.arm(TimerName::CompleteTimeout, Duration::from_secs(1), &mut fx);
    fx.clear();

    timers.cancel_all(&mut fx);
    assert_eq!(timers.live_count(), 0);
    assert_eq!(fx.len(), 2);
    assert!(fx.iter().all(|e| matches!(e, SideEffect::CancelTimer { .. })));
}

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use size_watcher::headless::headless_registry;
use size_watcher::{
    Breakpoint, BreakpointError, BreakpointSet, ElementId, MatchBy, ResizeEntry, Size, SizeWatcher,
};

fn entry(element: ElementId, width: f64, height: f64) -> ResizeEntry {
    ResizeEntry::new(element, (width, height))
}

fn width_set() -> BreakpointSet<&'static str> {
    BreakpointSet::new(
        vec![
            Breakpoint::new().max_width(400.0).with_data("narrow"),
            Breakpoint::new().min_width(400.0).with_data("wide"),
        ],
        MatchBy::Order,
    )
    .unwrap()
}

#[test]
fn first_measurement_selects_and_signals() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let selections = Rc::new(RefCell::new(Vec::new()));
    let sizes = Rc::new(RefCell::new(Vec::new()));

    let mut watcher = SizeWatcher::new(&registry, width_set())
        .on_breakpoint_change({
            let selections = selections.clone();
            move |rule, size| selections.borrow_mut().push((*rule.data().unwrap(), size))
        })
        .on_size_change({
            let sizes = sizes.clone();
            move |size, previous, current| {
                sizes
                    .borrow_mut()
                    .push((size, previous.is_none(), *current.data().unwrap()))
            }
        });

    watcher.with_current(|rule| assert!(rule.is_none()));
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();

    assert_eq!(
        *selections.borrow(),
        vec![("wide", Some(Size::new(640.0, 480.0)))]
    );
    // the very first size callback has no previous selection
    assert_eq!(
        *sizes.borrow(),
        vec![(Size::new(640.0, 480.0), true, "wide")]
    );
    assert_eq!(watcher.size(), Some(Size::new(640.0, 480.0)));
    watcher.with_current(|rule| assert_eq!(rule.unwrap().data(), Some(&"wide")));
}

#[test]
fn crossing_a_boundary_reselects() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let selections = Rc::new(RefCell::new(Vec::new()));

    let mut watcher = SizeWatcher::new(&registry, width_set()).on_breakpoint_change({
        let selections = selections.clone();
        move |rule, _| selections.borrow_mut().push(*rule.data().unwrap())
    });
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();
    registry.notify_resized(&[entry(element, 300.0, 480.0)]);
    scheduler.run_frame();

    assert_eq!(*selections.borrow(), vec!["wide", "narrow"]);
}

#[test]
fn insensitive_axis_changes_skip_rematch_but_report_size() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let rule_changes = Rc::new(Cell::new(0));
    let sizes = Rc::new(RefCell::new(Vec::new()));

    // rules constrain width only, so height changes can't move the selection
    let mut watcher = SizeWatcher::new(&registry, width_set())
        .on_breakpoint_change({
            let rule_changes = rule_changes.clone();
            move |_, _| rule_changes.set(rule_changes.get() + 1)
        })
        .on_size_change({
            let sizes = sizes.clone();
            move |size, _, _| sizes.borrow_mut().push(size)
        });
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();
    assert_eq!(rule_changes.get(), 1);

    registry.notify_resized(&[entry(element, 640.0, 800.0)]);
    scheduler.run_frame();

    // raw size still flows through; the selection stays put
    assert_eq!(rule_changes.get(), 1);
    assert_eq!(
        *sizes.borrow(),
        vec![Size::new(640.0, 480.0), Size::new(640.0, 800.0)]
    );
    watcher.with_current(|rule| assert_eq!(rule.unwrap().data(), Some(&"wide")));
}

#[test]
fn unchanged_size_reports_nothing() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let size_reports = Rc::new(Cell::new(0));

    let mut watcher = SizeWatcher::new(&registry, width_set()).on_size_change({
        let size_reports = size_reports.clone();
        move |_, _, _| size_reports.set(size_reports.get() + 1)
    });
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();
    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();

    assert_eq!(size_reports.get(), 1);
}

#[test]
fn eager_select_chooses_before_any_measurement() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let rule_changes = Rc::new(Cell::new(0));

    let mut watcher = SizeWatcher::new(&registry, width_set())
        .eager_select(true)
        .on_breakpoint_change({
            let rule_changes = rule_changes.clone();
            move |_, _| rule_changes.set(rule_changes.get() + 1)
        });

    // unmeasured width counts as unbounded, so the open-ended rule wins
    watcher.with_current(|rule| assert_eq!(rule.unwrap().data(), Some(&"wide")));

    watcher.attach(element);
    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();

    // the measurement confirmed the eager choice, so no change fired
    assert_eq!(rule_changes.get(), 0);

    registry.notify_resized(&[entry(element, 300.0, 480.0)]);
    scheduler.run_frame();
    assert_eq!(rule_changes.get(), 1);
}

#[test]
fn replacing_breakpoints_reselects_against_last_size() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let selections = Rc::new(RefCell::new(Vec::new()));

    let mut watcher = SizeWatcher::new(&registry, width_set()).on_breakpoint_change({
        let selections = selections.clone();
        move |rule, size| selections.borrow_mut().push((*rule.data().unwrap(), size))
    });
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    scheduler.run_frame();

    let replacement = BreakpointSet::new(
        vec![
            Breakpoint::new().max_width(700.0).with_data("roomy"),
            Breakpoint::new().min_width(700.0).with_data("vast"),
        ],
        MatchBy::Order,
    )
    .unwrap();
    watcher.set_breakpoints(replacement);

    assert_eq!(
        *selections.borrow(),
        vec![
            ("wide", Some(Size::new(640.0, 480.0))),
            ("roomy", Some(Size::new(640.0, 480.0))),
        ]
    );
}

#[test]
fn replacing_breakpoints_before_measurement_uses_the_unmeasured_assumption() {
    let (registry, _detector, _scheduler) = headless_registry();
    let selections = Rc::new(RefCell::new(Vec::new()));

    let watcher = SizeWatcher::new(&registry, width_set()).on_breakpoint_change({
        let selections = selections.clone();
        move |rule, size| selections.borrow_mut().push((*rule.data().unwrap(), size))
    });

    watcher.set_breakpoints(width_set());

    // selection happened with no size at all
    assert_eq!(*selections.borrow(), vec![("wide", None)]);
    watcher.with_current(|rule| assert_eq!(rule.unwrap().data(), Some(&"wide")));
}

#[test]
fn fallback_to_fallback_replacement_stays_silent() {
    let (registry, _detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let rule_changes = Rc::new(Cell::new(0));

    // nothing matches a 50px-wide container in either set
    let before = BreakpointSet::new(
        vec![Breakpoint::new().min_width(500.0).with_data("wide")],
        MatchBy::Order,
    )
    .unwrap();
    let after = BreakpointSet::new(
        vec![Breakpoint::new().min_width(800.0).with_data("wider")],
        MatchBy::Order,
    )
    .unwrap();

    let mut watcher = SizeWatcher::new(&registry, before).on_breakpoint_change({
        let rule_changes = rule_changes.clone();
        move |_, _| rule_changes.set(rule_changes.get() + 1)
    });
    watcher.attach(element);

    registry.notify_resized(&[entry(element, 50.0, 50.0)]);
    scheduler.run_frame();
    assert_eq!(rule_changes.get(), 1);
    watcher.with_current(|rule| assert!(rule.unwrap().data().is_none()));

    watcher.set_breakpoints(after);
    assert_eq!(rule_changes.get(), 1);
}

#[test]
fn detach_stops_notifications() {
    let (registry, detector, scheduler) = headless_registry();
    let element = ElementId::new();
    let size_reports = Rc::new(Cell::new(0));

    let mut watcher = SizeWatcher::new(&registry, width_set()).on_size_change({
        let size_reports = size_reports.clone();
        move |_, _, _| size_reports.set(size_reports.get() + 1)
    });
    watcher.attach(element);
    assert!(watcher.is_attached());

    registry.notify_resized(&[entry(element, 640.0, 480.0)]);
    watcher.detach();
    scheduler.run_frame();

    assert_eq!(size_reports.get(), 0);
    assert!(!watcher.is_attached());
    assert!(!detector.is_observing(element));
}

#[test]
fn dropping_a_watcher_releases_its_registration() {
    let (registry, detector, _scheduler) = headless_registry();
    let element = ElementId::new();

    {
        let mut watcher = SizeWatcher::new(&registry, width_set());
        watcher.attach(element);
        assert!(registry.is_registered(element));
    }

    assert!(!registry.is_registered(element));
    assert!(!detector.is_observing(element));
}

#[test]
fn reattaching_moves_the_registration() {
    let (registry, detector, _scheduler) = headless_registry();
    let first = ElementId::new();
    let second = ElementId::new();

    let mut watcher = SizeWatcher::new(&registry, width_set());
    watcher.attach(first);
    watcher.attach(second);

    assert_eq!(watcher.element(), Some(second));
    assert!(!detector.is_observing(first));
    assert!(detector.is_observing(second));
    assert_eq!(registry.registered_count(), 1);
}

#[test]
fn malformed_rules_surface_before_a_watcher_exists() {
    let err = BreakpointSet::<()>::new(
        vec![Breakpoint::new().min_width(100.0).max_width(50.0)],
        MatchBy::Order,
    )
    .unwrap_err();

    assert!(matches!(err, BreakpointError::InvertedRange { index: 0, .. }));
    // the message names the rule and the axis
    assert!(err.to_string().contains("breakpoint 0"));
    assert!(err.to_string().contains("width"));
}

#[test]
fn watchers_share_one_registry_without_interference() {
    let (registry, _detector, scheduler) = headless_registry();
    let a = ElementId::new();
    let b = ElementId::new();
    let a_rules = Rc::new(RefCell::new(Vec::new()));
    let b_rules = Rc::new(RefCell::new(Vec::new()));

    let mut watcher_a = SizeWatcher::new(&registry, width_set()).on_breakpoint_change({
        let a_rules = a_rules.clone();
        move |rule, _| a_rules.borrow_mut().push(*rule.data().unwrap())
    });
    let mut watcher_b = SizeWatcher::new(&registry, width_set()).on_breakpoint_change({
        let b_rules = b_rules.clone();
        move |rule, _| b_rules.borrow_mut().push(*rule.data().unwrap())
    });
    watcher_a.attach(a);
    watcher_b.attach(b);

    registry.notify_resized(&[entry(a, 640.0, 480.0), entry(b, 200.0, 480.0)]);
    scheduler.run_frame();

    assert_eq!(*a_rules.borrow(), vec!["wide"]);
    assert_eq!(*b_rules.borrow(), vec!["narrow"]);
}

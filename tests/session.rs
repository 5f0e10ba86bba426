//! Render session behaviour against a hand-driven host.
//!
//! Every test builds a session on a [`ManualHost`] with a [`HeadlessSurface`],
//! so frames only happen when the test advances the host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use rstest::rstest;
use scene_session::{
    Callback, Camera, ClockConfig, HeadlessSurface, ManualHost, OneOrMany, RenderObject, RenderSession,
    RenderSurface, ResizeEvent, ResizeRequest, SessionConfig, Unsubscribe,
};

type Session = RenderSession<HeadlessSurface>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn embedded_session(host: &Rc<ManualHost>) -> Session {
    init_logging();
    RenderSession::new(
        host.clone(),
        SessionConfig {
            embedded: true,
            ..Default::default()
        },
        Camera::perspective(50.0, 1.0, 1.0, 5000.0),
    )
    .unwrap()
}

fn counting_render(counter: &Rc<Cell<u32>>) -> Callback<HeadlessSurface> {
    let counter = counter.clone();
    Callback::render(move |_| counter.set(counter.get() + 1))
}

fn counting_resize(counter: &Rc<Cell<u32>>) -> Callback<HeadlessSurface> {
    let counter = counter.clone();
    Callback::resize(move |_| counter.set(counter.get() + 1))
}

#[rstest]
#[case("render")]
#[case("resize")]
fn on_appends_once_in_last_position(#[case] event: &str) {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    let make = |c: &Rc<Cell<u32>>| match event {
        "render" => counting_render(c),
        _ => counting_resize(c),
    };

    let first = make(&hits);
    let second = make(&hits);
    session.on(event, first.clone()).unwrap();
    session.on(event, second.clone()).unwrap();
    session.on(event, first.clone()).unwrap();

    assert_eq!(session.registrations(&first), 2);
    assert_eq!(session.registrations(&second), 1);
    assert_eq!(session.listener_position(&first), Some(2));
}

#[test]
fn unknown_event_is_ignored() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));

    assert!(session.on("click", counting_render(&hits)).is_none());
    assert!(session
        .on("click", vec![counting_render(&hits), counting_resize(&hits)])
        .is_none());
    assert_eq!(session.frame_listener_count(), 0);
    assert_eq!(session.resize_listener_count(), 0);
}

#[test]
fn mismatched_callback_kind_is_rejected_whole() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));

    let result = session.on("render", vec![counting_render(&hits), counting_resize(&hits)]);
    assert!(result.is_none());
    assert_eq!(session.frame_listener_count(), 0);
}

#[test]
fn bulk_registration_returns_matching_handles() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    let callbacks = vec![counting_render(&hits), counting_render(&hits), counting_render(&hits)];

    let handles = match session.on("render", callbacks.clone()) {
        Some(OneOrMany::Many(handles)) => handles,
        other => panic!("expected many handles, got {:?}", other),
    };
    assert_eq!(handles.len(), 3);
    for (handle, callback) in handles.iter().zip(&callbacks) {
        assert!(handle.callback().same_as(callback));
    }

    assert!(handles[1].unsubscribe());
    assert_eq!(session.frame_listener_count(), 2);
    assert_eq!(session.registrations(&callbacks[1]), 0);

    let single = session.on("render", counting_render(&hits));
    assert!(matches!(single, Some(OneOrMany::Single(_))));
}

#[test]
fn off_removes_exactly_one_occurrence() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    let cb = counting_render(&hits);

    session.on("render", vec![cb.clone(), cb.clone()]);
    assert!(session.off("render", &cb));
    assert_eq!(session.registrations(&cb), 1);

    let stranger = counting_render(&hits);
    assert!(!session.off("render", &stranger));
    assert_eq!(session.frame_listener_count(), 1);
    assert_eq!(session.resize_listener_count(), 0);
}

#[test]
fn off_resize_never_touches_frame_listeners() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    let frame = counting_render(&hits);
    let resize = counting_resize(&hits);

    session.on("render", frame.clone());
    session.on("resize", resize.clone());

    assert!(session.off("resize", &resize));
    assert_eq!(session.frame_listener_count(), 1);
    assert_eq!(session.registrations(&frame), 1);

    // passing a frame callback under "resize" finds nothing and removes nothing
    assert!(!session.off("resize", &frame));
    assert_eq!(session.frame_listener_count(), 1);
}

#[test]
fn unsubscribing_twice_is_harmless() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let handle = session.on_resize(|_| {});

    assert!(handle.unsubscribe());
    assert!(!handle.unsubscribe());
    assert_eq!(session.resize_listener_count(), 0);
}

#[test]
fn render_once_fires_each_listener_once() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let other = Rc::new(Cell::new(0));

    let d = deltas.clone();
    session.on_render(move |ctx| d.borrow_mut().push(ctx.delta));
    session.on("render", counting_render(&other));

    session.render_once();

    assert!(!session.is_running());
    assert!(!session.clock_running());
    assert_eq!(deltas.borrow().len(), 1);
    assert!(deltas.borrow()[0] >= 0.0);
    assert_eq!(other.get(), 1);
    assert_eq!(session.with_surface(|s| s.render_count()), Some(1));

    // the request made by that frame finds the session stopped
    host.advance_frame(Duration::from_millis(16));
    assert_eq!(other.get(), 1);
    assert_eq!(host.pending_frames(), 0);
}

#[test]
fn stop_before_first_scheduled_tick_ends_the_chain() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    session.on("render", counting_render(&hits));

    session.start_render();
    session.stop_render();
    assert!(!session.is_running());

    for _ in 0..5 {
        host.advance_frame(Duration::from_millis(16));
    }
    assert_eq!(hits.get(), 1);
    assert_eq!(host.pending_frames(), 0);
}

#[rstest]
#[case(1920, 1080)]
#[case(800, 600)]
#[case(300, 900)]
fn resize_sets_exact_aspect_and_notifies(#[case] width: u32, #[case] height: u32) {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let events = Rc::new(RefCell::new(Vec::new()));
    let second = Rc::new(Cell::new(0));

    let e = events.clone();
    session.on_resize(move |event| e.borrow_mut().push(event));
    session.on("resize", counting_resize(&second));

    session.resize(ResizeRequest::new(width, height));

    assert_eq!(
        session.with_camera(|c| c.aspect()),
        Some(Some(width as f32 / height as f32))
    );
    assert_eq!(session.with_surface(|s| s.size()), Some((width, height)));
    assert_eq!(*events.borrow(), vec![ResizeEvent { width, height }]);
    assert_eq!(second.get(), 1);
}

#[test]
fn resize_is_idempotent() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);

    session.resize(ResizeRequest::new(1024, 768));
    let first = session
        .with_camera(|c| (c.aspect(), c.projection_matrix()))
        .unwrap();
    let first_size = session.with_surface(|s| s.size());

    session.resize(ResizeRequest::new(1024, 768));
    let second = session
        .with_camera(|c| (c.aspect(), c.projection_matrix()))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first_size, session.with_surface(|s| s.size()));
}

#[test]
fn resize_defaults_are_read_at_call_time() {
    let host = Rc::new(ManualHost::new(400, 400));
    let session = embedded_session(&host);

    // the host changes size without telling anyone
    host.set_viewport(1200, 600);
    session.resize(ResizeRequest {
        width: None,
        height: Some(300),
    });
    assert_eq!(session.with_surface(|s| s.size()), Some((1200, 300)));

    session.resize(ResizeRequest::default());
    assert_eq!(session.with_surface(|s| s.size()), Some((1200, 600)));
    assert_eq!(session.with_camera(|c| c.aspect()), Some(Some(2.0)));
}

#[test]
fn zero_sized_resize_is_ignored() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    session.on("resize", counting_resize(&hits));

    session.resize(ResizeRequest::new(0, 0));
    assert_eq!(hits.get(), 0);
    assert_eq!(session.with_camera(|c| c.aspect()), Some(Some(1.0)));
}

#[test]
fn orthographic_camera_keeps_its_box_on_resize() {
    init_logging();
    let host = Rc::new(ManualHost::default());
    let camera = Camera::orthographic(20.0, 10.0, 0.1, 100.0);
    let projection = camera.projection;
    let session: Session = RenderSession::new(
        host.clone(),
        SessionConfig {
            embedded: true,
            ..Default::default()
        },
        camera,
    )
    .unwrap();

    session.resize(ResizeRequest::new(640, 480));
    assert_eq!(session.with_camera(|c| c.projection), Some(projection));
    assert_eq!(session.with_surface(|s| s.size()), Some((640, 480)));
}

#[test]
fn host_resize_events_drive_non_embedded_sessions() {
    init_logging();
    let host = Rc::new(ManualHost::new(800, 800));
    let session: Session = RenderSession::new(host.clone(), SessionConfig::default(), Camera::default()).unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    let e = events.clone();
    session.on_resize(move |event| e.borrow_mut().push((event.width, event.height)));

    host.set_viewport(1000, 250);
    host.fire_load();

    assert_eq!(*events.borrow(), vec![(1000, 250), (1000, 250)]);
    assert_eq!(session.with_camera(|c| c.aspect()), Some(Some(4.0)));

    session.dispose();
    assert_eq!(host.subscription_count(), 0);
    host.set_viewport(10, 10);
    assert_eq!(session.with_surface(|s| s.size()), Some((1000, 250)));
}

#[test]
fn listen_resize_does_not_double_subscribe() {
    init_logging();
    let host = Rc::new(ManualHost::default());
    let session: Session = RenderSession::new(host.clone(), SessionConfig::default(), Camera::default()).unwrap();
    session.listen_resize();
    assert_eq!(host.subscription_count(), 2);

    session.unlisten_resize();
    assert!(!session.is_listening());
    session.listen_resize();
    assert_eq!(host.subscription_count(), 2);
}

#[test]
fn listener_removing_another_mid_frame_neither_skips_nor_repeats() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = order.clone();
    let victim = session.on_render(move |_| o.borrow_mut().push("victim"));
    let victim = Rc::new(victim);

    // registered after the victim, removes itself on first call
    let o = order.clone();
    let slot: Rc<RefCell<Option<Unsubscribe<HeadlessSurface>>>> = Rc::new(RefCell::new(None));
    let s = slot.clone();
    let own = session.on_render(move |_| {
        o.borrow_mut().push("once");
        if let Some(handle) = s.borrow_mut().take() {
            handle.unsubscribe();
        }
    });
    *slot.borrow_mut() = Some(own);

    let o = order.clone();
    session.on_render(move |_| o.borrow_mut().push("last"));

    session.render_once();
    session.render_once();
    assert_eq!(
        *order.borrow(),
        vec!["victim", "once", "last", "victim", "last"]
    );

    // now remove the first listener from inside the second on the next frame
    let v = victim.clone();
    session.on_render(move |_| {
        v.unsubscribe();
    });
    order.borrow_mut().clear();
    session.render_once();
    assert_eq!(*order.borrow(), vec!["victim", "last"]);
    session.render_once();
    assert_eq!(*order.borrow(), vec!["victim", "last", "last"]);
}

#[test]
fn n_frames_sum_to_elapsed_time() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let d = deltas.clone();
    session.on_render(move |ctx| d.borrow_mut().push(ctx.delta));

    let steps = [16u64, 17, 33, 8, 16, 50, 1, 16];
    session.start_render();
    for ms in steps {
        host.advance_frame(Duration::from_millis(ms));
    }

    let deltas = deltas.borrow();
    // the start frame plus one per advanced frame
    assert_eq!(deltas.len(), steps.len() + 1);
    assert_eq!(deltas[0], 0.0);
    assert!(deltas.iter().all(|d| *d >= 0.0));

    let total: f64 = deltas.iter().sum();
    let expected = steps.iter().sum::<u64>() as f64 / 1000.0;
    assert!((total - expected).abs() < 1e-9, "{} vs {}", total, expected);
    assert_eq!(session.frame_count(), steps.len() as u64 + 1);
}

#[test]
fn listener_can_stop_the_loop() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let handle = session.clone();
    let frames = Rc::new(Cell::new(0));
    let f = frames.clone();
    session.on_render(move |ctx| {
        f.set(f.get() + 1);
        if ctx.frame == 2 {
            handle.stop_render();
        }
    });

    session.start_render();
    for _ in 0..10 {
        host.advance_frame(Duration::from_millis(16));
    }
    assert_eq!(frames.get(), 3);
    assert!(!session.is_running());
}

#[test]
fn clock_without_auto_start_still_runs_while_rendering() {
    init_logging();
    let host = Rc::new(ManualHost::default());
    let session: Session = RenderSession::new(
        host.clone(),
        SessionConfig {
            embedded: true,
            clock: ClockConfig { auto_start: false },
            ..Default::default()
        },
        Camera::default(),
    )
    .unwrap();
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let d = deltas.clone();
    session.on_render(move |ctx| d.borrow_mut().push(ctx.delta));

    session.start_render();
    assert!(session.clock_running());
    host.advance_frame(Duration::from_millis(100));
    session.stop_render();
    assert!(!session.clock_running());

    assert_eq!(deltas.borrow().len(), 2);
    assert!((deltas.borrow()[1] - 0.1).abs() < 1e-9);
}

#[test]
fn listeners_can_edit_the_scene() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    session.with_scene_mut(|scene| scene.add(RenderObject::new(0, 0)));

    session.on_render(|ctx| {
        let spin = ctx.delta as f32;
        if let Some(object) = ctx.scene.get_mut(0) {
            object.transform.rotate_y(spin);
        }
        ctx.scene.objects.push(RenderObject::new(1, 0));
    });

    session.render_once();
    assert_eq!(session.with_scene(|scene| scene.objects.len()), Some(2));
    assert_eq!(
        session.with_surface(|s| s.renders()[0].object_count),
        Some(2)
    );
}

#[test]
fn duplicate_registration_removed_mid_frame_runs_once() {
    let host = Rc::new(ManualHost::default());
    let session = embedded_session(&host);
    let hits = Rc::new(Cell::new(0));
    let twice = counting_render(&hits);

    let handle = session.clone();
    let target = twice.clone();
    session.on_render(move |_| {
        handle.off("render", &target);
    });
    session.on("render", vec![twice.clone(), twice.clone()]);

    session.render_once();
    assert_eq!(session.registrations(&twice), 1);
    assert_eq!(hits.get(), 1);
}

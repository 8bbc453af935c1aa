// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for pipeline setup and the capture cycle

use picam_tunnel::backends::simulated::SimulatedHal;
use picam_tunnel::errors::{HalCall, Status};
use picam_tunnel::hal::{ControlEvent, DisplaySet, Encoding, PortDirection, Rect};
use picam_tunnel::pipeline::{CaptureState, Checked, Sleeper};
use picam_tunnel::{CapturePipeline, PipelineConfig, PipelineError, TimingContext};
use std::time::Duration;

#[derive(Default)]
struct CountingSleeper {
    sleeps: usize,
    total: Duration,
}

impl Sleeper for CountingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps += 1;
        self.total += duration;
    }
}

fn initialized(hal: &SimulatedHal) -> CapturePipeline {
    CapturePipeline::initialize(hal, &PipelineConfig::default(), TimingContext::start())
        .expect("default pipeline should initialize")
}

#[test]
fn test_topology_after_initialize() {
    let hal = SimulatedHal::new();
    let pipeline = initialized(&hal);

    let camera = pipeline.camera().id;
    let render_1 = pipeline.preview_sink().component.id;
    let render_2 = pipeline.capture_sink().component.id;
    assert_eq!(hal.components().len(), 3);
    for id in [camera, render_1, render_2] {
        assert!(hal.is_enabled(id));
        assert!(hal.has_control_handler(id));
    }

    let connections = hal.connections();
    assert_eq!(connections.len(), 2);
    let endpoints: Vec<_> = connections
        .iter()
        .map(|c| {
            assert!(c.enabled);
            assert!(c.flags.is_tunnelled());
            (
                c.output.component,
                c.output.direction,
                c.output.index,
                c.input.component,
                c.input.direction,
                c.input.index,
            )
        })
        .collect();
    assert_eq!(
        endpoints,
        vec![
            (camera, PortDirection::Output, 0, render_1, PortDirection::Input, 0),
            (camera, PortDirection::Output, 2, render_2, PortDirection::Input, 0),
        ]
    );
}

#[test]
fn test_committed_formats_are_aligned_and_cropped() {
    let hal = SimulatedHal::new();
    let pipeline = initialized(&hal);

    let preview = hal.committed_format(pipeline.preview_port().port).unwrap();
    assert_eq!(preview.encoding, Encoding::I420);
    assert_eq!((preview.width, preview.height), (1024, 768));
    assert_eq!(preview.crop, Rect::new(0, 0, 1024, 768));

    let capture = hal.committed_format(pipeline.capture_port().port).unwrap();
    assert_eq!(capture.encoding, Encoding::Rgb24);
    assert_eq!(capture.crop, Rect::new(0, 0, 512, 512));

    // Renderer inputs mirror the camera outputs they are tunnelled from
    assert_eq!(
        hal.committed_format(pipeline.preview_sink().input.port),
        Some(preview)
    );
    assert_eq!(
        hal.committed_format(pipeline.capture_sink().input.port),
        Some(capture)
    );
}

#[test]
fn test_unaligned_request_is_padded_not_cropped() {
    let hal = SimulatedHal::new();
    let mut config = PipelineConfig::default();
    config.capture.width = 500;
    config.capture.height = 375;
    let pipeline = CapturePipeline::initialize(&hal, &config, TimingContext::start()).unwrap();

    let capture = hal.committed_format(pipeline.capture_port().port).unwrap();
    assert_eq!((capture.width, capture.height), (512, 384));
    assert_eq!(capture.crop, Rect::new(0, 0, 500, 375));
}

#[test]
fn test_display_regions_tile_screen() {
    let hal = SimulatedHal::new();
    let pipeline = initialized(&hal);

    let left = hal
        .display_region(pipeline.preview_sink().input.port)
        .unwrap();
    let right = hal
        .display_region(pipeline.capture_sink().input.port)
        .unwrap();

    assert_eq!(left.dest_rect, Rect::new(0, 0, 320, 480));
    assert_eq!(right.dest_rect, Rect::new(320, 0, 320, 480));
    assert!(!left.dest_rect.overlaps(&right.dest_rect));
    assert_eq!(left.dest_rect.area() + right.dest_rect.area(), 640 * 480);
    for region in [left, right] {
        assert!(!region.fullscreen);
        assert_eq!(region.set, DisplaySet::FULLSCREEN | DisplaySet::DEST_RECT);
    }
}

#[test]
fn test_any_failing_call_aborts_initialization() {
    let reference = SimulatedHal::new();
    initialized(&reference);
    let total_calls = reference.calls().len();
    assert_eq!(total_calls, 19);

    for index in 0..total_calls {
        let hal = SimulatedHal::new();
        hal.fail_at(index, Status::EIO);

        let err = CapturePipeline::initialize(&hal, &PipelineConfig::default(), TimingContext::start())
            .expect_err("injected failure must abort");
        match err {
            PipelineError::Hal(e) => {
                assert_eq!(e.status, Status::EIO);
                assert_eq!(e.call, reference.calls()[index]);
            }
            other => panic!("call {index}: unexpected error {other}"),
        }
        // Nothing is attempted after the failing call
        assert_eq!(hal.calls().len(), index + 1, "call {index}");
    }
}

#[test]
fn test_tunnel_creation_failure_is_fatal() {
    let hal = SimulatedHal::new();
    hal.fail_on(HalCall::CreateConnection, 1, Status::ENOSYS);

    let err = CapturePipeline::initialize(&hal, &PipelineConfig::default(), TimingContext::start())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Hal(e) if e.call == HalCall::CreateConnection && e.status == Status::ENOSYS
    ));
    assert_eq!(hal.connections().len(), 1);
    assert_eq!(hal.calls().last(), Some(&HalCall::CreateConnection));
}

#[test]
fn test_poll_loop_sleeps_once_per_poll() {
    for busy in 0..6usize {
        let hal = SimulatedHal::new();
        let mut pipeline = initialized(&hal);
        hal.script_capture_flag(std::iter::repeat_n(true, busy).chain([false]));
        let mut sleeper = CountingSleeper::default();
        let checked = Checked::new(&hal);

        let cycle = pipeline.cycle_mut();
        assert_eq!(cycle.state(), CaptureState::Capturing);
        cycle.step(checked, &mut sleeper).unwrap();
        assert_eq!(hal.capture_triggers(), 1);

        while cycle.step(checked, &mut sleeper).unwrap() != CaptureState::Capturing {}

        assert_eq!(sleeper.sleeps, busy + 1);
        assert_eq!(sleeper.total, Duration::from_millis(1000) * (busy as u32 + 1));
        assert_eq!(hal.capture_triggers(), 1, "no re-trigger while busy");

        cycle.step(checked, &mut sleeper).unwrap();
        assert_eq!(hal.capture_triggers(), 2);
        assert_eq!(sleeper.sleeps, busy + 1, "triggering does not sleep");
    }
}

#[test]
fn test_one_trigger_per_completed_capture() {
    let hal = SimulatedHal::with_busy_polls(2);
    let mut pipeline = initialized(&hal);
    let mut sleeper = CountingSleeper::default();
    let checked = Checked::new(&hal);

    let mut completed = 0;
    while completed < 5 {
        let before = pipeline.cycle().state();
        let after = pipeline.cycle_mut().step(checked, &mut sleeper).unwrap();
        if matches!(before, CaptureState::Polling { .. }) && after == CaptureState::Capturing {
            completed += 1;
        }
    }

    assert_eq!(hal.capture_triggers(), 5);
    assert_eq!(pipeline.cycle().captures_triggered(), 5);
    assert_eq!(sleeper.sleeps, 15);
    assert_eq!(pipeline.cycle().polls(), 15);
}

#[test]
fn test_control_buffers_released_under_concurrency() {
    let hal = SimulatedHal::new();
    let pipeline = initialized(&hal);
    let components = [
        pipeline.camera().id,
        pipeline.preview_sink().component.id,
        pipeline.capture_sink().component.id,
    ];

    std::thread::scope(|scope| {
        for id in components {
            let hal = &hal;
            scope.spawn(move || {
                for n in 0..25 {
                    let cmd = if n % 2 == 0 {
                        ControlEvent::PARAMETER_CHANGED
                    } else {
                        ControlEvent::ERROR
                    };
                    hal.notify(id, cmd).unwrap();
                }
            });
        }
    });

    let stats = hal.pool_stats();
    assert_eq!(stats.delivered, 75);
    assert_eq!(stats.released, 75);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(stats.held_past_return, 0);
    assert_eq!(pipeline.control_notifications(), 75);
}

#[test]
fn test_capture_trigger_notification_released() {
    let hal = SimulatedHal::new();
    let mut pipeline = initialized(&hal);
    let mut sleeper = CountingSleeper::default();
    let checked = Checked::new(&hal);

    for _ in 0..20 {
        pipeline.cycle_mut().step(checked, &mut sleeper).unwrap();
    }

    let stats = hal.pool_stats();
    assert_eq!(stats.delivered, 10);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(pipeline.control_notifications(), 10);
}

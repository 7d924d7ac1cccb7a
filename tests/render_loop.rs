use auralize::config::{SystemConfig, TrackerMode};
use auralize::io::{output_queue, DiscardSink};
use auralize::runtime::{Command, ExitStatus, LoopState, PeriodReport, ScriptedInput, System};

const BLOCK: usize = 64;

fn small_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.general.block_samples = BLOCK;
    config.renderer.bir_length_sec = 0.05;
    config.output.start_offset_periods = 0;
    config.output.play = false;
    config
}

#[test]
fn quit_command_ends_session_normally() {
    let system = System::new(small_config()).unwrap();
    let input = ScriptedInput::new([None, Some(Command::Calibrate), None, Some(Command::Quit)]);
    let status = system.run_with(DiscardSink::new(), input).unwrap();
    assert_eq!(status, ExitStatus::Normal);
    assert_eq!(status.code(), 0);
}

#[test]
fn exhausted_trajectory_stops_with_tracker_failure() {
    let mut config = small_config();
    config.tracker.mode = TrackerMode::Trajectory;
    config.tracker.frames = vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [20.0, 0.0, 0.0]];
    config.tracker.read_interval_ms = 10.0;
    config.tracker.looping = false;

    let system = System::new(config).unwrap();
    // No scripted commands: only the render thread can end the session.
    let status = system
        .run_with(DiscardSink::new(), ScriptedInput::new(Vec::<Option<Command>>::new()))
        .unwrap();
    assert_eq!(status, ExitStatus::TrackerFailure);
    assert_eq!(status.code(), -1);
    assert!(system.flags().should_stop());
}

#[test]
fn periods_deliver_interleaved_stereo_blocks() {
    let system = System::new(small_config()).unwrap();
    let (queue, mut reader) = output_queue(BLOCK, 4).unwrap();
    let mut cycle = system.build_cycle(queue).unwrap();
    assert_eq!(cycle.state(), LoopState::Uninitialized);
    cycle.start().unwrap();
    assert_eq!(cycle.state(), LoopState::Periodic);
    assert!(reader.is_open());

    let mut frames = vec![0.0f32; 2 * BLOCK];
    let mut left_energy = 0.0f32;
    let mut right_energy = 0.0f32;
    let mut ears_differ = false;
    for _ in 0..20 {
        assert_eq!(cycle.run_period(), PeriodReport::Continue);
        assert_eq!(reader.available(), 2 * BLOCK);
        assert_eq!(reader.pull(&mut frames), 2 * BLOCK);
        for frame in frames.chunks_exact(2) {
            left_energy += frame[0] * frame[0];
            right_energy += frame[1] * frame[1];
            ears_differ |= frame[0] != frame[1];
        }
    }

    // A still head renders once; later periods reuse the same kernels.
    assert_eq!(cycle.stats().bir_swaps, 1);
    assert_eq!(cycle.stats().periods, 20);
    assert_eq!(cycle.stats().short_transfers, 0);
    assert_eq!(cycle.current_bir().map(|bir| bir.generation()), Some(1));
    assert!(left_energy > 0.0 && right_energy > 0.0);
    assert!(ears_differ);

    cycle.drain();
    assert_eq!(cycle.state(), LoopState::Stopped);
    assert!(!reader.is_open());
}

#[test]
fn full_queue_costs_a_short_transfer_not_a_stall() {
    let system = System::new(small_config()).unwrap();
    let (queue, _reader) = output_queue(BLOCK, 4).unwrap();
    let mut cycle = system.build_cycle(queue).unwrap();
    cycle.start().unwrap();

    // Nobody drains the reader: four periods fill it, the rest are dropped.
    for _ in 0..6 {
        assert_eq!(cycle.run_period(), PeriodReport::Continue);
    }
    assert_eq!(cycle.stats().periods, 6);
    assert_eq!(cycle.stats().short_transfers, 2);
    assert_eq!(cycle.output().free(), 0);
}

#[test]
fn head_turns_swap_kernels_mid_session() {
    let mut config = small_config();
    config.tracker.mode = TrackerMode::Trajectory;
    config.tracker.frames = vec![[0.0, 0.0, 0.0], [45.0, 0.0, 0.0]];
    config.tracker.read_interval_ms = 5.0;
    config.tracker.looping = true;

    let system = System::new(config).unwrap();
    let mut cycle = system.build_cycle(DiscardSink::new()).unwrap();
    cycle.start().unwrap();
    for _ in 0..40 {
        assert_eq!(cycle.run_period(), PeriodReport::Continue);
    }
    let swaps = cycle.stats().bir_swaps;
    assert!(swaps > 2, "only {swaps} kernel swaps");
    assert_eq!(
        cycle.current_bir().map(|bir| bir.generation()),
        Some(swaps)
    );
    assert_eq!(cycle.output().bytes(), 40 * 2 * BLOCK as u64 * 4);
}

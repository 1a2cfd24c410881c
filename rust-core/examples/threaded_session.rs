/// Threaded example: one producer thread per sensor stream, one consumer
use std::thread;

use inertial_dr::{GeoFix, MotionSample, OrientationSample, Session, SessionRunner};

fn main() -> inertial_dr::Result<()> {
    println!("=== Inertial Dead-Reckoning: Threaded Session ===\n");

    let runner = SessionRunner::spawn(Session::default());
    runner.start()?;

    let orientation_tx = runner.sender();
    let orientation = thread::spawn(move || -> inertial_dr::Result<()> {
        // 20Hz compass, slowly turning right
        for i in 0..100 {
            let t = i as f64 * 50.0;
            orientation_tx.orientation(OrientationSample::new(t, 10.0 + i as f64 * 0.5, 2.0, 0.0))?;
        }
        Ok(())
    });

    let motion_tx = runner.sender();
    let motion = thread::spawn(move || -> inertial_dr::Result<()> {
        // 100Hz accelerometer
        for i in 0..500 {
            let t = i as f64 * 10.0;
            motion_tx.motion(MotionSample::new(t, 0.4, 0.1))?;
        }
        Ok(())
    });

    let fix_tx = runner.sender();
    let fixes = thread::spawn(move || -> inertial_dr::Result<()> {
        // 1Hz receiver walking north
        for i in 0..5 {
            let lat = 37.7749 + i as f64 * 1.5 / 111_320.0;
            fix_tx.fix(GeoFix::new(lat, -122.4194, 5.0, i as f64 * 1000.0))?;
        }
        Ok(())
    });

    for handle in [orientation, motion, fixes] {
        if let Ok(result) = handle.join() {
            result?;
        }
    }

    let snapshot = runner.snapshot()?;
    println!("Heading:          {:.1}°", snapshot.heading.heading_deg);
    println!("Accepted samples: {}", snapshot.motion_stats.accepted);
    println!("Path points:      {}", snapshot.path.len());
    println!("Ground truth:     {}", snapshot.ground_truth_trace.len());
    println!("Projected points: {}", snapshot.projected_trace.len());
    println!("\n{}", snapshot.trajectory_json()?);

    let session = runner.shutdown()?;
    println!("\nSession clock: {:?} ms", session.clock_ms());
    Ok(())
}

/// Basic usage example: feed sensor events, read back the trajectory
use inertial_dr::{GeoFix, MotionSample, OrientationSample, Session};

fn main() {
    println!("=== Inertial Dead-Reckoning: Basic Example ===\n");

    let mut session = Session::default();
    session.start();

    // First fix anchors the local frame
    session.on_fix(GeoFix::new(48.8584, 2.2945, 4.0, 0.0));

    // Device facing 90°, held level
    session.on_orientation(OrientationSample::new(0.0, 90.0, 1.0, -0.5));

    // Walking (0-2 s) then resting on a table (2-3 s), 50Hz
    for i in 0..150 {
        let t = i as f64 * 20.0;
        let (ax, ay) = if t < 2000.0 { (0.6, 0.05) } else { (0.01, 0.0) };
        session.on_motion(MotionSample::new(t, ax, ay));

        if i % 25 == 0 {
            let state = session.motion_state();
            println!(
                "t={:>6.0}ms  pos=({:>6.3}, {:>6.3}) m  speed={:.3} m/s",
                t,
                state.position.x,
                state.position.y,
                state.speed()
            );
        }
    }

    let heading = session.heading_state();
    let motion = session.motion_state();
    println!("\nHeading:        {:.1}°", heading.heading_deg);
    println!("Final position: ({:.3}, {:.3}) m", motion.position.x, motion.position.y);
    println!("Velocity:       ({:.3}, {:.3}) m/s", motion.velocity.x, motion.velocity.y);
    println!("Path points:    {}", session.path().len());

    if let Some(tip) = session.projected_trace().last() {
        println!("Projected tip:  {:.7}, {:.7}", tip.latitude, tip.longitude);
    }

    let report = session.correlation();
    println!("DR path length: {:.2} m", report.dr_path_length_m);
    if let Some(offset) = report.latest_offset_m {
        println!("Offset to last fix: {:.2} m", offset);
    }
}

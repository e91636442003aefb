pub fn integrate(positions: &mut [f32], velocities: &[f32], dt: f32) {
    for i in 0..positions.len() {
        positions[i] += velocities[i] * dt;
    }
}

pub fn wait_for_frame() {
    std::thread::sleep(std::time::Duration::from_millis(16));
}

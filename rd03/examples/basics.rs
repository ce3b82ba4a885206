use std::thread::sleep;
use std::time::Duration;

use rd03::{SerialTransport, RD03};

/// Simple demonstration that prints presence/distance every 100 ms.
///
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening serial device");
    let mut radar = RD03::new(SerialTransport::new("/dev/serial0"));
    println!("Configuring sensor");
    let config = radar.begin(0, 6, 5)?;
    println!("Window {}-{} cm, delay {:?}", config.min_distance_cm(), config.max_distance_cm(), config.delay());
    println!("Start sensor loop");
    loop {
        match radar.read_timeout(Duration::from_millis(500)) {
            Ok(_) => println!("someone={}, distance={}", radar.get_someone(), radar.get_distance()),
            Err(e) => println!("{e}"),
        }
        sleep(Duration::from_millis(100));
    }
}

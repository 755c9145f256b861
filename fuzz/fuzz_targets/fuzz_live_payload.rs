#![no_main]

use cuecaller::source::live_client::parse_payload;
use cuecaller::source::objectives::{ObjectiveClock, ObjectiveSpec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let clock = ObjectiveClock::new(vec![ObjectiveSpec {
        name: "dragon".to_string(),
        kill_event: "DragonKill".to_string(),
        first_spawn: 300,
        respawn: 300,
    }]);
    if let Ok(snapshot) = parse_payload(data, &clock) {
        assert!(snapshot.game_time.is_finite());
        assert!(snapshot.game_time >= 0.0);
    }
});

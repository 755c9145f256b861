#![no_main]

use cuecaller::cue::CuePack;
use cuecaller::cue::validation::PackValidator;
use cuecaller::phase::GamePhase;
use cuecaller::source::GameSnapshot;
use cuecaller::trigger::{FiringRecords, evaluate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(yaml) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(pack) = serde_yaml::from_str::<CuePack>(yaml) else {
        return;
    };
    let _ = PackValidator::new().validate(&pack, &["dragon".to_string()]);

    // Malformed cues must be skipped with a warning, never panic
    let mut records = FiringRecords::new();
    for t in [0.0, 30.0, 600.0, 3_600.0] {
        let eval = evaluate(GamePhase::InProgress, t, &pack.cues, &records, &GameSnapshot::at(t));
        assert!(eval.decisions.len() + eval.warnings.len() <= pack.cues.len());
        records = eval.records;
    }
});

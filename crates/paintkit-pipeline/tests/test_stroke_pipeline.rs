use paintkit_core::constants::{BED_MIN_Z, BRUSH_TIP_Z_OFFSET};
use paintkit_core::{CommandIdGenerator, StrokeError, Tag};
use paintkit_pipeline::{
    parse_samples, AdapterChain, AdapterKind, AdapterOptions, Preprocessor,
};

fn default_chain() -> AdapterChain {
    AdapterChain::from_kinds(
        &[
            AdapterKind::StartAndEndLift,
            AdapterKind::MirrorOnY,
            AdapterKind::CheckLimits,
        ],
        &AdapterOptions::default(),
    )
}

#[test]
fn test_two_samples_end_to_end() {
    let ids = CommandIdGenerator::new();
    let batch = parse_samples(&ids, &["0 0 0 100", "10 0 0 100"]).unwrap();
    assert_eq!(batch.len(), 2);
    for cmd in batch.iter() {
        assert!(cmd.has_tag(Tag::Contact));
        assert_eq!(cmd.feed, 6000.0);
        assert_eq!(cmd.z, Some(BRUSH_TIP_Z_OFFSET.max(BED_MIN_Z)));
    }
}

#[test]
fn test_preprocessor_merges_and_slows() {
    let ids = CommandIdGenerator::new();
    let lines = ["100 200 0 100", "100.2 200 0 100", "150 200 1 100"];
    let batch = Preprocessor::default().run(&ids, &lines).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].feed, 3600.0);
    assert_eq!(batch[1].z, Some(BRUSH_TIP_Z_OFFSET - 1.0));
}

#[test]
fn test_default_chain_mirrors_and_checks() {
    let ids = CommandIdGenerator::new();
    let batch = parse_samples(&ids, &["100 200 0 100", "150 250 0 100"]).unwrap();
    let out = default_chain().apply(batch, &ids).unwrap();
    assert_eq!(out.len(), 5);
    // entry move is contact and gets mirrored with the stroke
    assert_eq!(out[1].y, Some(998.0));
    assert_eq!(out[2].y, Some(998.0));
    assert_eq!(out[3].y, Some(948.0));
    assert_eq!(
        out.to_gcode_lines().first().map(String::as_str),
        Some("G1 Z0.000 F12000")
    );
}

#[test]
fn test_chain_rejects_out_of_bed_stroke() {
    let ids = CommandIdGenerator::new();
    // mirrored y = |-1198 + 1300| = 102 is fine, x beyond the bed is not
    let batch = parse_samples(&ids, &["900 1300 0 100"]).unwrap();
    let err = default_chain().apply(batch, &ids).unwrap_err();
    assert!(matches!(err, StrokeError::BoundsViolation { axis: 'X', .. }));
}

#[test]
fn test_lead_in_after_pointillism_is_rejected() {
    let ids = CommandIdGenerator::new();
    let chain = AdapterChain::from_kinds(
        &[AdapterKind::Pointillism, AdapterKind::LeadIn],
        &AdapterOptions::default(),
    );
    let lines: Vec<String> = (0..50).map(|i| format!("{} 300 0 50", i * 2)).collect();
    let batch = parse_samples(&ids, &lines).unwrap();
    let err = chain.apply(batch, &ids).unwrap_err();
    assert!(matches!(err, StrokeError::UnsupportedCombination { .. }));
}

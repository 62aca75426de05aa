//! Integration scenarios for the track editor: identity operations, mask
//! edits, lineage maintenance, and index/volume consistency.

use std::collections::BTreeSet;

use ndarray::{Array3, array};
use trackvol_core::{
    ArrayVolume, BBoxRow, Frame, Label, LineageGraph, TrackEditor, TrackError, TrackExtent,
    VolumeTxn,
};

/// Paint `label` over `pixels` in `frame`.
fn paint(data: &mut Array3<Label>, frame: Frame, label: Label, pixels: &[(usize, usize)]) {
    for &(y, x) in pixels {
        data[(frame, y, x)] = label;
    }
}

/// Label 5 spans frames 0–4 (drifting blob), label 6 spans frames 3–7,
/// spatially disjoint from 5.
fn two_track_volume() -> ArrayVolume {
    let mut data = Array3::zeros((8, 10, 10));
    for frame in 0..5 {
        paint(&mut data, frame, 5, &[(2, frame), (3, frame)]);
    }
    for frame in 3..8 {
        paint(&mut data, frame, 6, &[(7, 7), (7, 8)]);
    }
    ArrayVolume::from_array(data)
}

fn index_rows(editor: &TrackEditor) -> BTreeSet<BBoxRow> {
    editor.index().iter().copied().collect()
}

#[test]
fn validate_passes_after_construction() {
    let volume = two_track_volume();
    let editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    editor.validate(&volume).unwrap();
    assert_eq!(editor.stats().tracks, 2);
    assert_eq!(editor.stats().rows, 10);
}

#[test]
fn extent_reflects_entry_frames() {
    let volume = two_track_volume();
    let editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    assert_eq!(editor.index().extent(5).unwrap(), TrackExtent { start: 0, end: 4 });
    assert_eq!(editor.index().extent(6).unwrap(), TrackExtent { start: 3, end: 7 });
}

#[test]
fn add_then_delete_restores_pre_add_state() {
    let mut volume = two_track_volume();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    let pixels_before = volume.as_array().clone();
    let rows_before = index_rows(&editor);

    let mask = array![[true, false], [true, true]];
    let mut txn = volume.begin();
    editor.add_mask(6, 9, (4, 4), mask.view(), &mut txn).unwrap();
    txn.commit();
    assert!(editor.index().get(6, 9).is_ok());
    editor.validate(&volume).unwrap();

    let mut txn = volume.begin();
    editor.delete_mask(6, 9, &mut txn).unwrap();
    txn.commit();

    assert_eq!(volume.as_array(), &pixels_before);
    assert_eq!(index_rows(&editor), rows_before);
    editor.validate(&volume).unwrap();
}

#[test]
fn add_mask_rejects_conflict_bounds_and_empty() {
    let mut volume = two_track_volume();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    let mut txn = volume.begin();

    let mask = array![[true]];
    let err = editor.add_mask(0, 5, (0, 0), mask.view(), &mut txn).unwrap_err();
    assert!(matches!(err, TrackError::Conflict { frame: 0, label: 5 }));

    let big = array![[true, true], [true, true]];
    let err = editor.add_mask(0, 9, (9, 9), big.view(), &mut txn).unwrap_err();
    assert!(matches!(err, TrackError::Bounds { .. }));

    let empty = array![[false, false]];
    let err = editor.add_mask(0, 9, (0, 0), empty.view(), &mut txn).unwrap_err();
    assert!(matches!(err, TrackError::Validation { .. }));
}

#[test]
fn add_mask_uses_tight_window() {
    let mut volume = ArrayVolume::zeros(1, 6, 6);
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();

    // Set bits only in the middle of a padded window.
    let mask = array![
        [false, false, false, false],
        [false, true, true, false],
        [false, false, false, false]
    ];
    let mut txn = volume.begin();
    editor.add_mask(0, 3, (1, 1), mask.view(), &mut txn).unwrap();
    txn.commit();

    let bbox = editor.index().get(0, 3).unwrap();
    assert_eq!((bbox.min_y, bbox.min_x, bbox.max_y, bbox.max_x), (2, 2, 3, 4));
    editor.validate(&volume).unwrap();
}

#[test]
fn update_mask_replaces_without_cascade() {
    let mut volume = two_track_volume();
    let mut lineage = LineageGraph::new();
    lineage.terminate(6, "left field of view");
    let mut editor = TrackEditor::from_volume(&volume, lineage).unwrap();

    // Label 6 keeps only frame 3; updating that sole entry must not trip
    // the emptiness cascade even though the entry briefly disappears.
    let mut txn = volume.begin();
    for frame in 4..8 {
        editor.delete_mask(frame, 6, &mut txn).unwrap();
    }
    let mask = array![[true, true, true]];
    editor.update_mask(3, 6, (1, 1), mask.view(), &mut txn).unwrap();
    txn.commit();

    assert_eq!(editor.index().frames_of(6), vec![3]);
    assert_eq!(editor.lineage().annotation(6), Some("left field of view"));
    editor.validate(&volume).unwrap();
}

#[test]
fn swap_identities_twice_is_identity() {
    let mut data = Array3::zeros((2, 6, 6));
    // Interleaved pixels with fully overlapping bounding boxes; the
    // read-before-write rule is what keeps this correct.
    paint(&mut data, 0, 1, &[(2, 2), (3, 4)]);
    paint(&mut data, 0, 2, &[(2, 4), (3, 2)]);
    paint(&mut data, 1, 1, &[(2, 2)]);
    paint(&mut data, 1, 3, &[(4, 4)]);
    paint(&mut data, 1, 4, &[(5, 5)]);
    let mut volume = ArrayVolume::from_array(data);

    let mut lineage = LineageGraph::new();
    lineage.add_split(1, &[3, 4]).unwrap();
    lineage.terminate(2, "lysis");
    let mut editor = TrackEditor::from_volume(&volume, lineage.clone()).unwrap();
    let pixels_before = volume.as_array().clone();
    let rows_before = index_rows(&editor);

    let mut txn = volume.begin();
    editor.swap_identities(1, 2, &mut txn).unwrap();
    txn.commit();

    assert_eq!(editor.lineage().daughters(2), Some(&[3, 4][..]));
    assert_eq!(editor.lineage().annotation(1), Some("lysis"));
    assert_eq!(editor.index().frames_of(2), vec![0, 1]);
    editor.validate(&volume).unwrap();

    let mut txn = volume.begin();
    editor.swap_identities(1, 2, &mut txn).unwrap();
    txn.commit();

    assert_eq!(volume.as_array(), &pixels_before);
    assert_eq!(index_rows(&editor), rows_before);
    assert_eq!(editor.lineage(), &lineage);
    editor.validate(&volume).unwrap();
}

#[test]
fn break_track_suffix_inherits_forward_lineage() {
    // Label 5 on frames 0–4, daughters 8 and 9 starting at frame 5.
    let mut data = Array3::zeros((6, 10, 10));
    for frame in 0..5 {
        paint(&mut data, frame, 5, &[(2, frame), (3, frame)]);
    }
    paint(&mut data, 5, 8, &[(4, 4)]);
    paint(&mut data, 5, 9, &[(5, 5)]);
    let mut volume = ArrayVolume::from_array(data);

    let mut lineage = LineageGraph::new();
    lineage.terminate(5, "stopped");
    lineage.add_split(5, &[8, 9]).unwrap();
    let mut editor = TrackEditor::from_volume(&volume, lineage).unwrap();

    let mut txn = volume.begin();
    let minted = editor.break_track(2, 5, true, &mut txn).unwrap();
    txn.commit();

    assert_eq!(minted, 10);
    assert_eq!(editor.index().frames_of(5), vec![0, 1]);
    assert_eq!(editor.index().frames_of(minted), vec![2, 3, 4]);
    assert_eq!(editor.lineage().daughters(minted), Some(&[8, 9][..]));
    assert_eq!(editor.lineage().annotation(minted), Some("stopped"));
    assert!(!editor.lineage().references(5));
    editor.validate(&volume).unwrap();
}

#[test]
fn break_track_prefix_inherits_backward_lineage() {
    // Parent 2 on frames 0–2, daughters 6 and 9 from frame 3 on.
    let mut data = Array3::zeros((8, 10, 10));
    for frame in 0..3 {
        paint(&mut data, frame, 2, &[(0, 0)]);
    }
    for frame in 3..8 {
        paint(&mut data, frame, 6, &[(7, 7), (7, 8)]);
    }
    for frame in 3..5 {
        paint(&mut data, frame, 9, &[(1, 1)]);
    }
    let mut volume = ArrayVolume::from_array(data);

    let mut lineage = LineageGraph::new();
    lineage.add_split(2, &[6, 9]).unwrap();
    let mut editor = TrackEditor::from_volume(&volume, lineage).unwrap();

    let mut txn = volume.begin();
    let minted = editor.break_track(5, 6, false, &mut txn).unwrap();
    txn.commit();

    assert_eq!(minted, 10);
    assert_eq!(editor.index().frames_of(minted), vec![3, 4]);
    assert_eq!(editor.index().frames_of(6), vec![5, 6, 7]);
    assert_eq!(editor.lineage().daughters(2), Some(&[minted, 9][..]));
    editor.validate(&volume).unwrap();
}

#[test]
fn add_split_severs_parent_and_daughters() {
    let mut volume = two_track_volume();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    let pixels_before = volume.as_array().clone();

    let mut txn = volume.begin();
    let continuation = editor.add_split(3, 5, &[5, 6], &mut txn).unwrap();
    txn.commit();

    assert_eq!(continuation, 7);
    assert_eq!(editor.index().frames_of(5), vec![0, 1, 2]);
    assert_eq!(editor.index().frames_of(7), vec![3, 4]);
    assert_eq!(editor.index().frames_of(6), vec![3, 4, 5, 6, 7]);
    assert_eq!(editor.lineage().daughters(5), Some(&[7, 6][..]));

    // The continuation holds exactly the pixels label 5 had on frames 3–4.
    for frame in 3..5 {
        for y in 0..10 {
            for x in 0..10 {
                let before = pixels_before[(frame, y, x)];
                let expect = if before == 5 { 7 } else { before };
                assert_eq!(volume.as_array()[(frame, y, x)], expect);
            }
        }
    }
    editor.validate(&volume).unwrap();
}

#[test]
fn add_split_validation_failure_leaves_state_unchanged() {
    let mut volume = two_track_volume();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    let pixels_before = volume.as_array().clone();
    let rows_before = index_rows(&editor);
    let lineage_before = editor.lineage().clone();

    let mut txn = volume.begin();
    let err = editor.add_split(3, 5, &[6, 6], &mut txn).unwrap_err();
    assert!(matches!(err, TrackError::Validation { .. }));
    let err = editor.add_split(3, 5, &[], &mut txn).unwrap_err();
    assert!(matches!(err, TrackError::Validation { .. }));
    txn.commit();

    assert_eq!(volume.as_array(), &pixels_before);
    assert_eq!(index_rows(&editor), rows_before);
    assert_eq!(editor.lineage(), &lineage_before);
}

#[test]
fn terminate_track_truncates_and_annotates() {
    let mut data = Array3::zeros((6, 6, 6));
    for frame in 0..6 {
        paint(&mut data, frame, 3, &[(1, 1)]);
    }
    paint(&mut data, 4, 8, &[(4, 4)]);
    paint(&mut data, 4, 9, &[(5, 5)]);
    let mut volume = ArrayVolume::from_array(data);

    let mut lineage = LineageGraph::new();
    lineage.add_split(3, &[8, 9]).unwrap();
    let mut editor = TrackEditor::from_volume(&volume, lineage).unwrap();

    let mut txn = volume.begin();
    editor.terminate_track(2, 3, "lysis", &mut txn).unwrap();
    txn.commit();

    assert_eq!(editor.index().frames_of(3), vec![0, 1, 2]);
    assert_eq!(editor.lineage().annotation(3), Some("lysis"));
    assert!(editor.lineage().daughters(3).is_none());
    editor.validate(&volume).unwrap();
}

#[test]
fn delete_last_entry_cascades_and_collapses() {
    // Parent 1 on frames 0–1; daughters 2 (frame 2 only) and 3 (frames 2–3).
    let mut data = Array3::zeros((4, 6, 6));
    paint(&mut data, 0, 1, &[(1, 1)]);
    paint(&mut data, 1, 1, &[(1, 2)]);
    paint(&mut data, 2, 2, &[(0, 0)]);
    paint(&mut data, 2, 3, &[(4, 4)]);
    paint(&mut data, 3, 3, &[(4, 5)]);
    let mut volume = ArrayVolume::from_array(data);

    let mut lineage = LineageGraph::new();
    lineage.add_split(1, &[2, 3]).unwrap();
    lineage.terminate(2, "apoptosis");
    let mut editor = TrackEditor::from_volume(&volume, lineage).unwrap();

    let mut txn = volume.begin();
    editor.delete_mask(2, 2, &mut txn).unwrap();
    txn.commit();

    // 2 is gone entirely: annotation dropped, graph membership dropped, and
    // the split 1 -> [3] collapsed by folding 3 back into 1.
    assert!(editor.lineage().is_empty());
    assert!(editor.index().frames_of(2).is_empty());
    assert!(editor.index().frames_of(3).is_empty());
    assert_eq!(editor.index().frames_of(1), vec![0, 1, 2, 3]);
    assert_eq!(volume.as_array()[(2, 4, 4)], 1);
    assert_eq!(volume.as_array()[(3, 4, 5)], 1);
    editor.validate(&volume).unwrap();
}

#[test]
fn discarded_transaction_leaves_volume_unchanged() {
    let mut volume = two_track_volume();
    let pixels_before = volume.as_array().clone();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();

    let mut txn = volume.begin();
    editor.delete_mask(0, 5, &mut txn).unwrap();
    txn.discard();

    // Pixels rolled back; the editor is stale by contract and must be
    // rebuilt from the volume before further use.
    assert_eq!(volume.as_array(), &pixels_before);
    assert!(editor.validate(&volume).is_err());
    let editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    editor.validate(&volume).unwrap();
}

#[test]
fn validate_reports_symmetric_difference() {
    let mut volume = two_track_volume();
    let editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();

    // Mutate pixels behind the editor's back.
    let mut txn = volume.begin();
    let selection = array![[true]];
    txn.write_where(0, 0..1, 0..1, &selection, 9).unwrap();
    txn.commit();

    match editor.validate(&volume).unwrap_err() {
        TrackError::Integrity { missing, unexpected } => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].frame, 0);
            assert_eq!(missing[0].label, 9);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected Integrity error, got {other:?}"),
    }
}

#[test]
fn parts_round_trip_through_serde() {
    let mut volume = two_track_volume();
    let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new()).unwrap();
    let mut txn = volume.begin();
    editor.add_split(3, 5, &[5, 6], &mut txn).unwrap();
    txn.commit();

    let (index, lineage) = editor.into_parts();
    let index_json = serde_json::to_string(&index).unwrap();
    let lineage_json = serde_json::to_string(&lineage).unwrap();

    let mut index: trackvol_core::BBoxIndex = serde_json::from_str(&index_json).unwrap();
    index.rebuild_lookup().unwrap();
    let lineage: LineageGraph = serde_json::from_str(&lineage_json).unwrap();

    let editor = TrackEditor::new(index, lineage);
    editor.validate(&volume).unwrap();
    assert_eq!(editor.lineage().daughters(5), Some(&[7, 6][..]));
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use quiznet::catalog::{Catalog, Difficulty, QuestionKind};

use crate::unit_tests::write_fixture_catalog;

fn load_fixture() -> Catalog {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture_catalog(dir.path());
    Catalog::load(&path, 200, 20).expect("load fixture")
}

#[test]
fn test_fixture_shape() {
    let catalog = load_fixture();

    assert_eq!(catalog.themes().len(), 3);
    assert_eq!(catalog.themes()[0].name, "Booleans");
    assert_eq!(catalog.themes()[1].name, "Choices");
    assert_eq!(catalog.themes()[2].name, "Texts");

    let b = catalog.get(1).expect("first boolean");
    assert_eq!(b.kind, QuestionKind::Boolean);
    assert_eq!(b.difficulty, Difficulty::Easy);
    assert_eq!(b.correct_index, 1);

    let q = catalog.get(13).expect("first multi-choice");
    assert_eq!(q.kind, QuestionKind::MultiChoice);
    assert_eq!(q.options, vec!["Alpha", "Beta", "Gamma", "Delta"]);

    let t = catalog.get(25).expect("free text");
    assert_eq!(t.kind, QuestionKind::FreeText);
    assert_eq!(t.accepted, vec!["Paris", "paris"]);
}

#[test]
fn test_select_respects_themes_and_difficulty() {
    let catalog = load_fixture();

    let picked = catalog
        .select(Difficulty::Easy, &[1], 10)
        .expect("ten multi-choice");
    assert_eq!(picked.len(), 10);
    for id in &picked {
        let q = catalog.get(*id).expect("picked");
        assert_eq!(q.kind, QuestionKind::MultiChoice);
        assert!(q.theme_ids.contains(&1));
    }

    // 12 booleans exist, 13 cannot be drawn.
    assert!(catalog.select(Difficulty::Easy, &[0], 13).is_none());
    // No hard questions at all.
    assert!(catalog.select(Difficulty::Hard, &[0, 1, 2], 1).is_none());
    // Any-of theme matching widens the pool.
    let wide = catalog.select(Difficulty::Easy, &[0, 1, 2], 25).expect("all");
    assert_eq!(wide.len(), 25);
}

#[test]
fn test_max_questions_cap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture_catalog(dir.path());
    let capped = Catalog::load(&path, 5, 20).expect("load capped");

    assert!(capped.get(5).is_some());
    assert!(capped.get(6).is_none());
}

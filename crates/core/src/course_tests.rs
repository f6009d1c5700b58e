// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn model_with_one_topic() -> (CourseModel, TopicId) {
    let mut model = CourseModel::new("Test Course", "python");
    let section = model.add_section("Week 1");
    let topic = model.add_topic(section, "Intro", "slides/week1".into());
    (model, topic)
}

#[test]
fn arena_links_are_consistent() {
    let (mut model, topic) = model_with_one_topic();
    let file = model.add_file(
        topic,
        "slides/week1/slides_intro.py".into(),
        FileKind::Notebook {
            prog_lang: "python".into(),
        },
        1,
    );

    let f = model.file(file);
    assert_eq!(f.topic, topic);
    let t = model.topic(f.topic);
    assert_eq!(t.files, vec![file]);
    let s = model.section(t.section);
    assert_eq!(s.topics, vec![topic]);
}

#[test]
fn notebooks_are_numbered_within_their_topic() {
    let (mut model, topic) = model_with_one_topic();
    let nb = || FileKind::Notebook {
        prog_lang: "python".into(),
    };
    let first = model.add_file(topic, "slides/week1/slides_a.py".into(), nb(), 1);
    // A diagram between two notebooks must not consume a number.
    model.add_file(
        topic,
        "slides/week1/img/arch.pu".into(),
        FileKind::Diagram(DiagramKind::Plantuml),
        0,
    );
    let second = model.add_file(topic, "slides/week1/slides_b.py".into(), nb(), 1);

    assert_eq!(model.file(first).number_in_topic, 1);
    assert_eq!(model.file(second).number_in_topic, 2);
}

#[parameterized(
    plain = { "slides/week1/slides_intro.py", "Intro" },
    multi_word = { "slides/week1/slides_getting_started.py", "Getting Started" },
    no_prefix = { "slides/week1/extra_notes.py", "Extra Notes" },
)]
fn titles_come_from_the_stem(path: &str, expected: &str) {
    let (mut model, topic) = model_with_one_topic();
    let file = model.add_file(
        topic,
        path.into(),
        FileKind::Notebook {
            prog_lang: "python".into(),
        },
        1,
    );
    assert_eq!(model.file(file).title(), expected);
}

#[test]
fn stages_are_sorted_and_deduped() {
    let (mut model, topic) = model_with_one_topic();
    model.add_file(
        topic,
        "a.pu".into(),
        FileKind::Diagram(DiagramKind::Plantuml),
        0,
    );
    model.add_file(
        topic,
        "slides_a.py".into(),
        FileKind::Notebook {
            prog_lang: "python".into(),
        },
        1,
    );
    model.add_file(
        topic,
        "slides_b.py".into(),
        FileKind::Notebook {
            prog_lang: "python".into(),
        },
        1,
    );
    // Data files never occupy a stage.
    model.add_file(topic, "data.csv".into(), FileKind::DataFile, 0);

    assert_eq!(model.stages(), vec![0, 1]);
}

#[test]
fn files_in_order_follows_declaration_order() {
    let mut model = CourseModel::new("C", "python");
    let s1 = model.add_section("One");
    let s2 = model.add_section("Two");
    let t2 = model.add_topic(s2, "Later", "b".into());
    let t1 = model.add_topic(s1, "Earlier", "a".into());
    model.add_file(t2, "b/slides_x.py".into(), FileKind::DataFile, 0);
    model.add_file(t1, "a/slides_y.py".into(), FileKind::DataFile, 0);

    let order: Vec<_> = model
        .files_in_order()
        .map(|f| f.path.display().to_string())
        .collect();
    // Section order wins over insertion order.
    assert_eq!(order, vec!["a/slides_y.py", "b/slides_x.py"]);
}

#[test]
fn file_for_path_finds_exact_match() {
    let (mut model, topic) = model_with_one_topic();
    model.add_file(
        topic,
        "slides/week1/img/arch.drawio".into(),
        FileKind::Diagram(DiagramKind::Drawio),
        0,
    );
    assert!(model
        .file_for_path(std::path::Path::new("slides/week1/img/arch.drawio"))
        .is_some());
    assert!(model
        .file_for_path(std::path::Path::new("slides/week1/img/other.drawio"))
        .is_none());
}

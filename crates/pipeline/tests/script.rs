//! Script search: parsing, the line-split fallback, per-action retrieval and
//! export.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{
    capabilities, memory_store, service_with, ScriptedParser, ScriptedTranslator,
    UnavailableStore,
};
use takeone_core::degradation::Degradation;
use takeone_core::metadata::SearchFilters;
use takeone_core::script::ExportFormat;
use takeone_pipeline::{PipelineError, SearchOptions};

const LIBRARY: &[&str] = &[
    "person walking down a street at night",
    "door opens in a kitchen",
    "car chase through the street",
    "pouring espresso",
];

#[tokio::test]
async fn malformed_parser_output_falls_back_to_lines() {
    let mut caps = capabilities(memory_store());
    caps.script_parser = Some(Arc::new(ScriptedParser::malformed()));
    let service = service_with(caps, LIBRARY).await;

    let script = "person walking at night\n\n  door opens  \ncar chase\n";
    let result = service
        .search_script(script, 2, &SearchFilters::default(), SearchOptions::default())
        .await
        .unwrap();

    let order: Vec<u32> = result.results.iter().map(|r| r.sequence_index).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(result.results[1].action_text, "door opens");
    assert_eq!(result.results[1].matches[0].segment_id, "film_scene_0001");
    assert_eq!(result.results[2].matches[0].segment_id, "film_scene_0002");
    assert!(result.results.iter().all(|r| r.matches.len() <= 2));
    assert_matches!(
        result.degradations.as_slice(),
        [Degradation::ScriptParseFailed { .. }]
    );
}

#[tokio::test]
async fn parsed_actions_keep_their_sequence() {
    let mut caps = capabilities(memory_store());
    caps.script_parser = Some(Arc::new(ScriptedParser::returning(&[
        (1, "pouring espresso"),
        (2, "person walking in the street"),
    ])));
    let service = service_with(caps, LIBRARY).await;

    let result = service
        .search_script(
            "A barista makes coffee. Then someone leaves the cafe.",
            1,
            &SearchFilters::default(),
            SearchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.total_actions(), 2);
    assert_eq!(result.total_matches(), 2);
    assert_eq!(result.results[0].matches[0].segment_id, "film_scene_0003");
    assert_eq!(result.results[1].matches[0].segment_id, "film_scene_0000");
    assert!(result.degradations.is_empty());
}

#[tokio::test]
async fn unordered_or_blank_parser_output_falls_back_to_lines() {
    let mut caps = capabilities(memory_store());
    caps.script_parser = Some(Arc::new(ScriptedParser::returning(&[
        (2, "pouring espresso"),
        (1, "door opens"),
        (1, "   "),
    ])));
    let service = service_with(caps, LIBRARY).await;

    let result = service
        .search_script(
            "door opens\npouring espresso",
            1,
            &SearchFilters::default(),
            SearchOptions::default(),
        )
        .await
        .unwrap();

    let order: Vec<(u32, &str)> = result
        .results
        .iter()
        .map(|r| (r.sequence_index, r.action_text.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "door opens"), (2, "pouring espresso")]);
    assert_eq!(result.results[0].matches[0].segment_id, "film_scene_0001");
    assert_eq!(result.results[1].matches[0].segment_id, "film_scene_0003");
    assert_matches!(
        result.degradations.as_slice(),
        [Degradation::ScriptParseFailed { .. }]
    );
}

#[tokio::test]
async fn script_is_translated_once() {
    let translator = Arc::new(ScriptedTranslator::with(&[(
        "una puerta se abre\nun perro corre",
        "door opens\ndog running",
    )]));
    let mut caps = capabilities(memory_store());
    caps.translator = Some(translator.clone());
    let service = service_with(caps, LIBRARY).await;

    let result = service
        .search_script(
            "una puerta se abre\nun perro corre",
            3,
            &SearchFilters::default(),
            SearchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(translator.call_count(), 1);
    assert_eq!(result.translated_script.as_deref(), Some("door opens\ndog running"));
    assert_eq!(result.results[0].action_text, "door opens");
    assert_eq!(result.original_script, "una puerta se abre\nun perro corre");
}

#[tokio::test]
async fn action_without_matches_has_an_empty_list() {
    let service = service_with(capabilities(memory_store()), &[]).await;
    let result = service
        .search_script("door opens\ncar chase", 3, &SearchFilters::default(), SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(result.total_actions(), 2);
    assert!(result.results.iter().all(|r| r.matches.is_empty()));
}

#[tokio::test]
async fn unavailable_store_fails_the_script_search() {
    let service = service_with(capabilities(Arc::new(UnavailableStore)), &[]).await;
    let result = service
        .search_script("door opens", 3, &SearchFilters::default(), SearchOptions::default())
        .await;
    assert_matches!(result, Err(PipelineError::Store(_)));
}

#[tokio::test]
async fn blank_script_is_rejected() {
    let service = service_with(capabilities(memory_store()), LIBRARY).await;
    let result = service
        .search_script(" \n ", 3, &SearchFilters::default(), SearchOptions::default())
        .await;
    assert_matches!(result, Err(PipelineError::Core(_)));
}

#[tokio::test]
async fn export_renders_csv() {
    let service = service_with(capabilities(memory_store()), LIBRARY).await;
    let csv = service
        .export_script("door opens\npouring espresso", 1, &SearchFilters::default(), ExportFormat::Csv)
        .await
        .unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Sequence,Action,Clip Path,Score,Duration,Description");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("clips/film_1.mp4"));
    assert!(lines[2].contains("clips/film_3.mp4"));
}

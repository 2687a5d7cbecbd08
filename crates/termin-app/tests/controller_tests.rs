// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use termin_app::{
    Column, ConfigKey, Controller, DatasetId, DatasetMode, EntryGateway, FilterSet, ListQuery,
    LoadOutcome, NoticeLevel, ScreenBody, SortDirection, SortState, SpecialFilter, TableStatus,
    ValidationError, render,
};
use termin_testkit::{GatewayCall, MemoryGateway, Operation, sample_entries};

fn started(gateway: &MemoryGateway) -> Result<Controller<MemoryGateway>> {
    let mut controller = Controller::new(gateway.clone(), 20);
    let requests = controller.start()?;
    controller.run_loads(requests);
    Ok(controller)
}

fn list_queries(gateway: &MemoryGateway) -> Vec<ListQuery> {
    gateway
        .calls_of(Operation::ListEntries)
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::ListEntries(query) => Some(query),
            _ => None,
        })
        .collect()
}

#[test]
fn start_uses_persisted_mode_and_first_dataset() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let controller = started(&gateway)?;

    assert_eq!(controller.query().mode, DatasetMode::Wpi);
    assert_eq!(controller.display().dataset, Some(DatasetId::new("202405")));
    assert_eq!(controller.display().table, TableStatus::Ready);
    assert_eq!(controller.display().rows.len(), 20);
    assert_eq!(controller.display().total, 47);
    assert_eq!(controller.display().statistics.missing_count, 10);
    assert!(!controller.has_pending_loads());
    Ok(())
}

#[test]
fn start_at_prefers_listed_dataset_and_falls_back_to_first() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = Controller::new(gateway.clone(), 20);
    let requests = controller.start_at(Some(DatasetId::new("202404")))?;
    controller.run_loads(requests);
    assert_eq!(controller.display().dataset, Some(DatasetId::new("202404")));
    assert_eq!(controller.display().total, 23);
    assert_eq!(gateway.calls_of(Operation::ListEntries).len(), 1);

    let mut controller = Controller::new(gateway, 20);
    let requests = controller.start_at(Some(DatasetId::new("199901")))?;
    controller.run_loads(requests);
    assert_eq!(controller.display().dataset, Some(DatasetId::new("202405")));
    Ok(())
}

#[test]
fn start_in_empty_mode_shows_no_data_without_loading() -> Result<()> {
    let gateway = MemoryGateway::demo().with_setting("statistics", "emiso");
    let controller = started(&gateway)?;

    assert_eq!(controller.query().mode, DatasetMode::Emiso);
    assert_eq!(controller.display().table, TableStatus::NoData);
    assert!(gateway.calls_of(Operation::ListEntries).is_empty());
    assert!(gateway.calls_of(Operation::Statistics).is_empty());
    Ok(())
}

#[test]
fn settings_failure_falls_back_to_default_mode() -> Result<()> {
    let gateway = MemoryGateway::demo().with_setting("statistics", "emiso");
    gateway.fail(Operation::GetSettings, "settings table missing");
    let controller = started(&gateway)?;

    assert_eq!(controller.query().mode, DatasetMode::Wpi);
    assert_eq!(controller.display().table, TableStatus::Ready);
    let notice = controller.display().notice.clone();
    assert!(notice.is_some_and(|notice| notice.level == NoticeLevel::Error));
    Ok(())
}

#[test]
fn catalog_failure_is_reported_as_failed_table() {
    let gateway = MemoryGateway::demo();
    gateway.fail(Operation::ListDatasets, "connection refused");
    let mut controller = Controller::new(gateway.clone(), 20);

    let error = controller.start().expect_err("catalog failure should surface");
    assert!(format!("{error:#}").contains("connection refused"));
    assert!(matches!(
        controller.display().table,
        TableStatus::Failed(ref message) if message.contains("connection refused")
    ));
    assert!(gateway.calls_of(Operation::ListEntries).is_empty());
}

#[test]
fn second_special_filter_replaces_first() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let requests = controller.toggle_special_filter(SpecialFilter::MissingFiles)?;
    controller.run_loads(requests);
    let requests = controller.toggle_special_filter(SpecialFilter::RejectedFiles)?;
    controller.run_loads(requests);

    assert_eq!(
        controller.query().filters.special(),
        Some(SpecialFilter::RejectedFiles)
    );
    let last = list_queries(&gateway).pop().expect("list call recorded");
    assert_eq!(
        last.filters.query_pairs(),
        vec![("rejected_files".to_owned(), "true".to_owned())]
    );
    assert_eq!(controller.display().total, 5);
    Ok(())
}

#[test]
fn sort_toggle_flips_active_field_and_resets_others() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let requests = controller.set_sort(Column::Datei)?;
    controller.run_loads(requests);
    assert_eq!(controller.query().sort.direction, SortDirection::Desc);
    assert_eq!(controller.display().rows[0].datei, "BMI_202405_0046.xml");

    let requests = controller.set_sort(Column::Typ)?;
    controller.run_loads(requests);
    let screen = render(&controller.view());
    assert_eq!(screen.header[0].sort, None);
    assert_eq!(screen.header[3].sort, Some(SortDirection::Asc));
    Ok(())
}

#[test]
fn reset_clears_filters_page_and_special_indicators() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let requests = controller.set_page(3)?;
    controller.run_loads(requests);
    let requests = controller.toggle_special_filter(SpecialFilter::MissingFiles)?;
    controller.run_loads(requests);
    let requests = controller.set_filter(Column::Datei, "BMI")?;
    controller.run_loads(requests);

    let requests = controller.reset_filters()?;
    controller.run_loads(requests);
    assert!(controller.query().filters.is_empty());
    assert_eq!(controller.query().page, 1);
    let screen = render(&controller.view());
    assert!(screen.special_filters.iter().all(|(_, active)| !active));
    assert_eq!(controller.display().total, 47);
    Ok(())
}

#[test]
fn stale_filter_response_is_never_rendered() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let first = controller.set_filter(Column::Typ, "A")?;
    let second = controller.set_filter(Column::Typ, "AK")?;

    let latest: Vec<LoadOutcome> = second
        .iter()
        .map(|request| request.execute(controller.gateway()))
        .collect();
    for outcome in latest {
        assert!(controller.apply(outcome).is_empty());
    }
    let late: Vec<LoadOutcome> = first
        .iter()
        .map(|request| request.execute(controller.gateway()))
        .collect();
    for outcome in late {
        assert!(controller.apply(outcome).is_empty());
    }

    assert_eq!(controller.display().total, 12);
    assert!(
        controller
            .display()
            .rows
            .iter()
            .all(|entry| entry.typ == "AK")
    );
    Ok(())
}

#[test]
fn filtered_sorted_second_page_issues_one_matching_list_call() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let requests = controller.set_sort(Column::Datei)?;
    controller.run_loads(requests);
    let superseded = controller.set_page(2)?;
    let requests = controller.set_filter(Column::Typ, "A")?;
    controller.run_loads(requests);

    gateway.clear_calls();
    let requests = controller.set_page(2)?;
    controller.run_loads(requests);
    let shown = controller.display().rows.clone();

    for request in &superseded {
        let outcome = request.execute(controller.gateway());
        assert!(controller.apply(outcome).is_empty());
    }

    let mut filters = FilterSet::default();
    filters.set_column(Column::Typ, "A");
    let expected = ListQuery {
        dataset: DatasetId::new("202405"),
        mode: DatasetMode::Wpi,
        page: 2,
        page_size: 20,
        sort: SortState {
            field: Column::Datei,
            direction: SortDirection::Desc,
        },
        filters,
    };
    let matching = list_queries(&gateway)
        .into_iter()
        .filter(|query| *query == expected)
        .count();
    assert_eq!(matching, 1);
    assert_eq!(controller.display().rows, shown);
    assert_eq!(shown.len(), 4);
    assert!(shown.iter().all(|entry| entry.typ.contains('A')));
    Ok(())
}

#[test]
fn switching_to_empty_mode_shows_call_to_action_without_loading() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let requests = controller.set_filter(Column::Typ, "K")?;
    controller.run_loads(requests);

    gateway.clear_calls();
    let requests = controller.switch_mode(DatasetMode::Emiso)?;
    assert!(requests.is_empty());
    assert!(gateway.calls_of(Operation::ListEntries).is_empty());
    assert!(gateway.calls_of(Operation::Statistics).is_empty());
    assert_eq!(gateway.persisted_mode(), Some(DatasetMode::Emiso));

    assert!(controller.query().filters.is_empty());
    assert_eq!(controller.display().total, 0);
    let screen = render(&controller.view());
    assert_eq!(screen.summary.total, 0);
    assert_eq!(screen.summary.missing_count, 0);
    assert!(screen.pager.is_empty());
    match screen.body {
        ScreenBody::NoData { call_to_action } => assert!(call_to_action.contains("eMISO")),
        other => panic!("expected no-data body, got {other:?}"),
    }
    Ok(())
}

#[test]
fn switching_to_populated_mode_resets_query_and_loads_first_dataset() -> Result<()> {
    let emiso = DatasetId::new("202403");
    let gateway = MemoryGateway::demo().with_dataset(
        DatasetMode::Emiso,
        emiso.clone(),
        sample_entries(&emiso, 5),
    );
    let mut controller = started(&gateway)?;
    let requests = controller.set_filter(Column::Typ, "K")?;
    controller.run_loads(requests);
    let requests = controller.next_page()?;
    controller.run_loads(requests);

    gateway.clear_calls();
    let requests = controller.switch_mode(DatasetMode::Emiso)?;
    assert_eq!(requests.len(), 2);
    controller.run_loads(requests);

    assert_eq!(gateway.persisted_mode(), Some(DatasetMode::Emiso));
    assert!(controller.query().filters.is_empty());
    assert_eq!(controller.query().page, 1);
    assert_eq!(controller.display().dataset, Some(emiso));
    assert_eq!(controller.display().total, 5);
    let listed = list_queries(&gateway);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].mode, DatasetMode::Emiso);
    assert_eq!(gateway.calls_of(Operation::Statistics).len(), 1);

    let requests = controller.switch_mode(DatasetMode::Wpi)?;
    controller.run_loads(requests);
    assert_eq!(controller.display().dataset, Some(DatasetId::new("202405")));
    assert_eq!(controller.display().total, 47);
    Ok(())
}

#[test]
fn catalog_failure_after_mode_persisted_keeps_new_mode() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let requests = controller.set_filter(Column::Typ, "K")?;
    controller.run_loads(requests);

    gateway.fail(Operation::ListDatasets, "catalog unavailable");
    let error = controller
        .switch_mode(DatasetMode::Emiso)
        .expect_err("catalog failure should surface");

    assert!(format!("{error:#}").contains("catalog unavailable"));
    assert_eq!(gateway.persisted_mode(), Some(DatasetMode::Emiso));
    assert_eq!(controller.query().mode, DatasetMode::Emiso);
    assert!(controller.query().filters.is_empty());
    assert!(controller.display().catalog.is_empty());
    assert_eq!(controller.display().dataset, None);
    assert!(matches!(controller.display().table, TableStatus::Failed(_)));
    assert!(!controller.has_pending_loads());

    gateway.clear_failures();
    let requests = controller.reload()?;
    assert!(requests.is_empty());
    assert_eq!(controller.display().table, TableStatus::NoData);
    Ok(())
}

#[test]
fn switching_to_current_mode_is_a_no_op() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    gateway.clear_calls();

    assert!(controller.switch_mode(DatasetMode::Wpi)?.is_empty());
    assert!(gateway.calls().is_empty());
    Ok(())
}

#[test]
fn failed_mode_persistence_rolls_back_and_keeps_catalog() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let requests = controller.set_filter(Column::Typ, "B")?;
    controller.run_loads(requests);

    gateway.fail(Operation::SwitchMode, "settings are read-only");
    gateway.clear_calls();
    let error = controller
        .switch_mode(DatasetMode::Emiso)
        .expect_err("persistence failure should surface");

    assert!(format!("{error:#}").contains("settings are read-only"));
    assert_eq!(controller.query().mode, DatasetMode::Wpi);
    assert_eq!(controller.query().filters.column(Column::Typ), Some("B"));
    assert_eq!(controller.display().catalog.len(), 2);
    assert!(gateway.calls_of(Operation::ListDatasets).is_empty());
    assert_eq!(
        controller.display().notice.as_ref().map(|notice| notice.level),
        Some(NoticeLevel::Error)
    );
    Ok(())
}

#[test]
fn selecting_dataset_resets_query_and_reload_keeps_it() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let requests = controller.set_filter(Column::Datei, "00")?;
    controller.run_loads(requests);

    let requests = controller.select_dataset(&DatasetId::new("202404"))?;
    controller.run_loads(requests);
    assert!(controller.query().filters.is_empty());
    assert_eq!(controller.display().total, 23);

    let requests = controller.reload()?;
    controller.run_loads(requests);
    assert_eq!(controller.display().dataset, Some(DatasetId::new("202404")));

    assert!(controller.select_dataset(&DatasetId::new("199901")).is_err());
    Ok(())
}

#[test]
fn out_of_range_page_refetches_first_page() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let requests = controller.last_page()?;
    controller.run_loads(requests);
    assert_eq!(controller.query().page, 3);

    let dataset = DatasetId::new("202405");
    let shrunk = sample_entries(&dataset, 10);
    let _ = gateway
        .clone()
        .with_dataset(DatasetMode::Wpi, dataset, shrunk);
    gateway.clear_calls();
    let requests = controller.reload()?;
    controller.run_loads(requests);

    let pages: Vec<usize> = list_queries(&gateway)
        .iter()
        .map(|query| query.page)
        .collect();
    assert_eq!(pages, vec![3, 1]);
    assert_eq!(controller.query().page, 1);
    assert_eq!(controller.display().rows.len(), 10);
    assert_eq!(controller.display().table, TableStatus::Ready);
    Ok(())
}

#[test]
fn page_moves_are_clamped() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    assert!(controller.prev_page()?.is_empty());
    let requests = controller.set_page(99)?;
    controller.run_loads(requests);
    assert_eq!(controller.query().page, 3);
    assert!(controller.next_page()?.is_empty());
    Ok(())
}

#[test]
fn transport_failure_restores_shown_query_and_replaces_table() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let shown = controller.query().clone();

    gateway.fail(Operation::ListEntries, "server returned 500");
    gateway.fail(Operation::Statistics, "server returned 500");
    let requests = controller.set_sort(Column::Typ)?;
    controller.run_loads(requests);

    assert_eq!(controller.query(), &shown);
    assert!(matches!(controller.display().table, TableStatus::Failed(_)));
    assert!(controller.display().statistics_error.is_some());
    let screen = render(&controller.view());
    assert!(matches!(screen.body, ScreenBody::Message(_)));
    assert_eq!(screen.header[0].sort, Some(SortDirection::Asc));

    gateway.clear_failures();
    let requests = controller.set_sort(Column::Typ)?;
    controller.run_loads(requests);
    assert_eq!(
        controller.query().sort,
        SortState {
            field: Column::Typ,
            direction: SortDirection::Asc,
        }
    );
    assert_eq!(controller.display().table, TableStatus::Ready);
    assert!(controller.display().statistics_error.is_none());
    Ok(())
}

#[test]
fn repeating_failed_page_and_filter_actions_retries_them() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let shown = controller.query().clone();

    gateway.fail(Operation::ListEntries, "connection reset");
    let requests = controller.next_page()?;
    controller.run_loads(requests);
    assert_eq!(controller.query().page, 1);
    let requests = controller.toggle_special_filter(SpecialFilter::MissingFiles)?;
    controller.run_loads(requests);
    assert_eq!(controller.query().filters.special(), None);

    let _superseded = controller.set_sort(Column::Typ)?;
    let requests = controller.set_filter(Column::Typ, "A")?;
    controller.run_loads(requests);
    assert_eq!(controller.query(), &shown);

    gateway.clear_failures();
    let requests = controller.next_page()?;
    controller.run_loads(requests);
    assert_eq!(controller.query().page, 2);
    assert_eq!(controller.display().rows.len(), 20);

    let requests = controller.toggle_special_filter(SpecialFilter::MissingFiles)?;
    controller.run_loads(requests);
    assert_eq!(
        controller.query().filters.special(),
        Some(SpecialFilter::MissingFiles)
    );
    assert_eq!(controller.query().page, 1);
    assert_eq!(controller.display().total, 10);
    Ok(())
}

#[test]
fn commit_saves_closes_session_and_reloads() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let id = controller.display().rows[0].id.clone();

    controller.open_entry(&id)?;
    let session = controller.session_mut().expect("session open");
    session.set_comment("checked by hand");
    session.set_ok(true);

    gateway.clear_calls();
    let requests = controller.commit_entry()?;
    assert_eq!(requests.len(), 2);
    controller.run_loads(requests);

    assert!(controller.session().is_none());
    assert_eq!(gateway.calls_of(Operation::ListEntries).len(), 1);
    assert_eq!(gateway.calls_of(Operation::Statistics).len(), 1);
    let saved = gateway
        .entry(DatasetMode::Wpi, &DatasetId::new("202405"), &id)
        .expect("entry exists");
    assert_eq!(saved.comment, "checked by hand");
    assert!(saved.ok);
    assert!(saved.last_updated.is_some());
    assert_eq!(
        controller.display().notice.as_ref().map(|notice| notice.level),
        Some(NoticeLevel::Info)
    );
    Ok(())
}

#[test]
fn failed_commit_keeps_session_edits_and_skips_reload() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let id = controller.display().rows[1].id.clone();

    controller.open_entry(&id)?;
    let session = controller.session_mut().expect("session open");
    session.push_comment_char('x');
    session.toggle_ok();

    gateway.fail(Operation::PutEntry, "disk full");
    gateway.clear_calls();
    let error = controller.commit_entry().expect_err("commit should fail");
    assert!(format!("{error:#}").contains("disk full"));

    let session = controller.session().expect("session stays open");
    assert_eq!(session.buffer().comment, "x");
    assert!(session.buffer().ok);
    assert!(session.error().is_some_and(|message| message.contains("disk full")));
    assert!(gateway.calls_of(Operation::ListEntries).is_empty());
    assert!(gateway.calls_of(Operation::Statistics).is_empty());
    Ok(())
}

#[test]
fn only_one_session_may_be_open() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let first = controller.display().rows[0].id.clone();
    let second = controller.display().rows[1].id.clone();

    controller.open_entry(&first)?;
    assert!(controller.open_entry(&second).is_err());
    assert_eq!(controller.session().map(|session| session.id()), Some(&first));
    Ok(())
}

#[test]
fn cancel_discards_edits_without_network() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    let id = controller.display().rows[0].id.clone();
    controller.open_entry(&id)?;
    if let Some(session) = controller.session_mut() {
        session.set_comment("never saved");
    }

    gateway.clear_calls();
    assert!(controller.cancel_entry());
    assert!(controller.session().is_none());
    assert!(gateway.calls().is_empty());
    let stored = gateway
        .entry(DatasetMode::Wpi, &DatasetId::new("202405"), &id)
        .expect("entry exists");
    assert_eq!(stored.comment, "");
    Ok(())
}

#[test]
fn invalid_period_is_rejected_before_any_call() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    gateway.clear_calls();

    let error = controller
        .begin_import("2024-5")
        .expect_err("malformed period");
    assert!(matches!(
        error.downcast_ref::<ValidationError>(),
        Some(ValidationError::InvalidPeriod(_))
    ));
    assert!(!controller.is_busy());
    assert!(gateway.calls().is_empty());
    Ok(())
}

#[test]
fn import_blocks_mutations_until_finished() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let import = controller.begin_import("202406")?;
    assert!(controller.is_busy());
    assert!(controller.set_filter(Column::Typ, "A").is_err());
    assert!(controller.set_sort(Column::Typ).is_err());
    assert!(controller.next_page().is_err());
    assert!(controller.reset_filters().is_err());
    assert!(controller.switch_mode(DatasetMode::Emiso).is_err());
    assert!(controller.begin_import("202407").is_err());
    assert!(controller.query().filters.is_empty());
    assert_eq!(controller.query().mode, DatasetMode::Wpi);

    let outcome = import.execute(controller.gateway());
    let requests = controller.finish_import(outcome)?;
    controller.run_loads(requests);

    assert!(!controller.is_busy());
    assert_eq!(
        controller.display().catalog.first(),
        Some(&DatasetId::new("202406"))
    );
    assert_eq!(
        controller.display().dataset,
        Some(DatasetId::new("202406"))
    );
    assert_eq!(controller.display().total, 30);
    Ok(())
}

#[test]
fn failed_import_clears_busy_and_reports() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;
    gateway.fail(Operation::TriggerImport, "upstream portal unavailable");

    let import = controller.begin_import("202406")?;
    let outcome = import.execute(controller.gateway());
    assert!(controller.finish_import(outcome)?.is_empty());

    assert!(!controller.is_busy());
    let notice = controller.display().notice.clone().expect("notice set");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("upstream portal unavailable"));
    assert_eq!(
        controller.display().dataset,
        Some(DatasetId::new("202405"))
    );
    Ok(())
}

#[test]
fn config_values_are_validated_then_saved() -> Result<()> {
    let gateway = MemoryGateway::demo();
    let mut controller = started(&gateway)?;

    let error = controller
        .save_config(ConfigKey::AuthFilePath, "  ")
        .expect_err("empty value");
    assert!(error.downcast_ref::<ValidationError>().is_some());

    controller.save_config(ConfigKey::ImportCutDate, "20240301")?;
    let config = controller.load_config()?;
    assert_eq!(
        config.get("IMPORT_CUT_DATE").map(String::as_str),
        Some("20240301")
    );
    assert_eq!(gateway.get_config()?.len(), 2);
    Ok(())
}

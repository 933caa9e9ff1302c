//! CLI integration tests.
//!
//! Tests cover:
//! - Config loading and data path resolution with real INI files on disk
//! - Filter argument overlay on session defaults
//! - Search, analysis and classification pipelines with captured output
//! - Full command dispatch against a CSV fixture

mod common;

use clap::Parser;
use common::*;
use shipscope::adapters::cached_source::CachedShipmentSource;
use shipscope::adapters::file_config_adapter::FileConfigAdapter;
use shipscope::adapters::html_report::HtmlReportAdapter;
use shipscope::adapters::seasonal_trend_model::SeasonalTrendModel;
use shipscope::cli::{self, AnalysisRequest, Cli, Command, FilterArgs, SourceArgs};
use shipscope::domain::error::ShipscopeError;
use shipscope::domain::filter::FilterCriteria;
use shipscope::domain::session::View;
use shipscope::ports::report_port::ReportPort;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn output_of(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_file() {
        let file = write_temp_ini("[data]\npath = shipments.csv\n");
        let config = cli::load_config(file.path()).unwrap();
        let path = cli::resolve_data_path(&config, None).unwrap();
        assert_eq!(path, PathBuf::from("shipments.csv"));
    }

    #[test]
    fn load_config_missing_file_is_parse_error() {
        let err = cli::load_config(Path::new("/nonexistent/shipscope.ini")).unwrap_err();
        assert!(matches!(err, ShipscopeError::ConfigParse { .. }));
    }

    #[test]
    fn data_override_wins() {
        let config = FileConfigAdapter::from_string("[data]\npath = a.csv\n").unwrap();
        let path = cli::resolve_data_path(&config, Some(Path::new("b.csv"))).unwrap();
        assert_eq!(path, PathBuf::from("b.csv"));
    }

    #[test]
    fn missing_data_path_is_config_error() {
        let config = FileConfigAdapter::from_string("[forecast]\n").unwrap();
        let err = cli::resolve_data_path(&config, None).unwrap_err();
        assert!(matches!(err, ShipscopeError::ConfigMissing { key, .. } if key == "path"));
    }
}

mod criteria {
    use super::*;

    fn defaults() -> FilterCriteria {
        FilterCriteria::new(date("2024-01-01"), date("2024-06-30")).unwrap()
    }

    #[test]
    fn empty_args_keep_defaults() {
        let criteria = cli::build_criteria(&defaults(), &FilterArgs::default()).unwrap();
        assert_eq!(criteria, defaults());
    }

    #[test]
    fn args_override_fields() {
        let args = FilterArgs {
            from: Some(date("2024-02-01")),
            country: "Japan".into(),
            min_containers: 50,
            ..FilterArgs::default()
        };
        let criteria = cli::build_criteria(&defaults(), &args).unwrap();
        assert_eq!(criteria.date_start, date("2024-02-01"));
        assert_eq!(criteria.date_end, date("2024-06-30"));
        assert_eq!(criteria.arrival_country.to_string(), "Japan");
        assert!(criteria.loading_port.is_wildcard());
        assert_eq!(criteria.min_container_threshold, 50);
    }

    #[test]
    fn single_bound_past_defaults_moves_other_end() {
        let args = FilterArgs {
            from: Some(date("2024-08-01")),
            ..FilterArgs::default()
        };
        let criteria = cli::build_criteria(&defaults(), &args).unwrap();
        assert_eq!(criteria.date_start, date("2024-08-01"));
        assert_eq!(criteria.date_end, date("2024-08-01"));

        let args = FilterArgs {
            to: Some(date("2023-12-01")),
            ..FilterArgs::default()
        };
        let criteria = cli::build_criteria(&defaults(), &args).unwrap();
        assert_eq!(criteria.date_start, date("2023-12-01"));
        assert_eq!(criteria.date_end, date("2023-12-01"));
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let args = FilterArgs {
            from: Some(date("2024-05-01")),
            to: Some(date("2024-03-01")),
            ..FilterArgs::default()
        };
        let err = cli::build_criteria(&defaults(), &args).unwrap_err();
        assert!(matches!(err, ShipscopeError::InvalidCriteria { .. }));
    }
}

mod pipelines {
    use super::*;

    #[test]
    fn search_prints_rankings() {
        let mut out = Vec::new();
        let args = FilterArgs {
            min_containers: 50,
            ..FilterArgs::default()
        };
        let session = cli::run_search_pipeline(&scenario_records(), &args, 10, &mut out)
            .unwrap()
            .unwrap();
        let text = output_of(out);

        assert_eq!(session.view(), View::Search);
        assert!(text.contains("1 shipments, 2024-01-05 ~ 2024-02-01"));
        assert!(text.contains("min 50 containers"));
        assert!(text.contains("Exporters (1 total)"));
        assert!(text.contains("B"));
        assert!(text.contains("100"));
        assert!(text.contains("Carriers (1 total)"));
    }

    #[test]
    fn search_with_no_matches_says_so() {
        let mut out = Vec::new();
        let args = FilterArgs {
            country: "Brazil".into(),
            ..FilterArgs::default()
        };
        cli::run_search_pipeline(&scenario_records(), &args, 10, &mut out).unwrap();
        assert!(output_of(out).contains("No shipments match"));
    }

    #[test]
    fn empty_table_prints_no_data() {
        let mut out = Vec::new();
        let session = cli::run_search_pipeline(&[], &FilterArgs::default(), 10, &mut out).unwrap();
        assert!(session.is_none());

        let request = AnalysisRequest {
            exporters: vec!["A".into()],
            ..AnalysisRequest::default()
        };
        cli::run_analysis_pipeline(&[], &request, None, None, None, &mut out).unwrap();

        let advisor = MockLanguageModel::replying("[]");
        cli::run_classify_pipeline(&[], &FilterArgs::default(), 10, &advisor, &mut out).unwrap();
        assert_eq!(advisor.call_count(), 0);
        assert_eq!(output_of(out).matches("No shipments loaded.").count(), 3);
    }

    #[test]
    fn start_after_last_shipment_is_no_data() {
        let mut out = Vec::new();
        let args = FilterArgs {
            from: Some(date("2025-01-01")),
            ..FilterArgs::default()
        };
        cli::run_search_pipeline(&scenario_records(), &args, 10, &mut out).unwrap();
        assert!(output_of(out).contains("No shipments match"));

        let mut out = Vec::new();
        let request = AnalysisRequest {
            exporters: vec!["A".into()],
            to: Some(date("2023-12-31")),
            ..AnalysisRequest::default()
        };
        cli::run_analysis_pipeline(&scenario_records(), &request, None, None, None, &mut out)
            .unwrap();
        assert!(output_of(out).contains("No shipments for A"));
    }

    #[test]
    fn analysis_prints_views_and_writes_report() {
        let dir = TempDir::new().unwrap();
        let report_path = dir.path().join("out").join("hanil.html");
        let mut out = Vec::new();
        let request = AnalysisRequest {
            exporters: vec!["Hanil Steel".into()],
            forecast: true,
            ..AnalysisRequest::default()
        };
        let model = SeasonalTrendModel::default();
        let advisor = MockLanguageModel::replying("Company overview: steel coils.");
        let html = HtmlReportAdapter::new();

        cli::run_analysis_pipeline(
            &season_records(),
            &request,
            Some(&model),
            Some(&advisor),
            Some((&html as &dyn ReportPort, report_path.as_path())),
            &mut out,
        )
        .unwrap();

        let text = output_of(out);
        assert!(text.contains("Analysis: Hanil Steel"));
        assert!(text.contains("Destination countries"));
        assert!(text.contains("Forecast (monthly)"));
        assert!(text.contains("MAE over last 30 dates"));
        assert!(text.contains("Company overview: steel coils."));
        assert_eq!(advisor.call_count(), 1);

        let contents = std::fs::read_to_string(&report_path).unwrap();
        assert!(contents.contains("Hanil Steel"));
        assert!(contents.contains("Company overview: steel coils."));
    }

    #[test]
    fn advisor_failure_does_not_fail_analysis() {
        let mut out = Vec::new();
        let request = AnalysisRequest {
            exporters: vec!["Hanil Steel".into()],
            ..AnalysisRequest::default()
        };
        let advisor = MockLanguageModel::failing("rate limited");
        let records = season_records();
        cli::run_analysis_pipeline(&records, &request, None, Some(&advisor), None, &mut out)
            .unwrap();
        let text = output_of(out);
        assert!(text.contains("Sales report unavailable."));
        assert!(!text.contains("Forecast"));
    }

    #[test]
    fn forecast_failure_does_not_fail_analysis() {
        let mut out = Vec::new();
        let request = AnalysisRequest {
            exporters: vec!["B".into()],
            forecast: true,
            ..AnalysisRequest::default()
        };
        let model = SeasonalTrendModel::default();
        let records = scenario_records();
        cli::run_analysis_pipeline(&records, &request, Some(&model), None, None, &mut out)
            .unwrap();
        let text = output_of(out);
        assert!(text.contains("Forecast unavailable"));
        assert!(text.contains("Japan"));
    }

    #[test]
    fn analysis_for_unknown_exporter_is_no_data() {
        let mut out = Vec::new();
        let request = AnalysisRequest {
            exporters: vec!["Nobody".into()],
            ..AnalysisRequest::default()
        };
        cli::run_analysis_pipeline(&scenario_records(), &request, None, None, None, &mut out)
            .unwrap();
        assert!(output_of(out).contains("No shipments for Nobody"));
    }

    #[test]
    fn classification_lists_shippers() {
        let mut out = Vec::new();
        let advisor = MockLanguageModel::replying(r#"["Hanil Steel"]"#);
        let filters = FilterArgs::default();
        cli::run_classify_pipeline(&season_records(), &filters, 10, &advisor, &mut out).unwrap();
        let text = output_of(out);
        assert!(text.contains("Actual shippers (1 of 2)"));
        assert!(text.contains("Hanil Steel"));
        assert!(advisor.calls.borrow()[0].1.contains("Busan Sea & Air"));
    }

    #[test]
    fn malformed_classification_is_a_warning() {
        let mut out = Vec::new();
        let advisor = MockLanguageModel::replying("I think they are all shippers.");
        let filters = FilterArgs::default();
        cli::run_classify_pipeline(&season_records(), &filters, 10, &advisor, &mut out).unwrap();
        assert!(output_of(out).contains("Classification unavailable."));
    }
}

mod dispatch {
    use super::*;

    fn fixture(ini_extra: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("shipments.csv");
        std::fs::write(&data, to_csv(&season_records())).unwrap();
        let config = dir.path().join("shipscope.ini");
        std::fs::write(
            &config,
            format!("[data]\npath = {}\n{}", data.display(), ini_extra),
        )
        .unwrap();
        (dir, config)
    }

    #[test]
    fn parses_analyze_arguments() {
        let cli = Cli::try_parse_from([
            "shipscope",
            "--user",
            "analyst01",
            "analyze",
            "-c",
            "conf.ini",
            "-e",
            "Hanil Steel",
            "-e",
            "Daesung Foods",
            "--from",
            "2024-01-01",
            "--no-forecast",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("analyst01"));
        match cli.command {
            Command::Analyze {
                exporter,
                from,
                no_forecast,
                ai_report,
                ..
            } => {
                assert_eq!(exporter, vec!["Hanil Steel", "Daesung Foods"]);
                assert_eq!(from, Some(date("2024-01-01")));
                assert!(no_forecast);
                assert!(!ai_report);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn analyze_requires_an_exporter() {
        assert!(Cli::try_parse_from(["shipscope", "analyze", "-c", "conf.ini"]).is_err());
    }

    #[test]
    fn invalid_date_argument_is_rejected() {
        let result = Cli::try_parse_from([
            "shipscope", "search", "-c", "conf.ini", "--from", "01/02/2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn shared_store_loads_the_table_once() {
        let (_dir, config) = fixture("");
        let data_path = config.with_file_name("shipments.csv");
        let inner = MockShipmentSource::new()
            .with_table(data_path.to_str().unwrap(), season_records());
        let store = CachedShipmentSource::new(inner);
        let source = SourceArgs {
            config: config.clone(),
            data: None,
        };

        let (_, first) = cli::open_source(&store, &source, None).unwrap();
        let (_, second) = cli::open_source(&store, &source, None).unwrap();
        assert_eq!(first.len(), season_records().len());
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(store.cached_paths(), 1);
    }

    #[test]
    fn header_only_csv_succeeds_with_no_data() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("shipments.csv");
        std::fs::write(&data, format!("{CSV_HEADER}\n")).unwrap();
        let config = dir.path().join("shipscope.ini");
        std::fs::write(&config, format!("[data]\npath = {}\n", data.display())).unwrap();
        let config = config.to_str().unwrap();

        for args in [
            vec!["shipscope", "overview", "-c", config],
            vec!["shipscope", "search", "-c", config],
            vec!["shipscope", "analyze", "-c", config, "-e", "Hanil Steel", "--no-forecast"],
        ] {
            let code = cli::run(Cli::try_parse_from(&args).unwrap());
            assert_eq!(
                format!("{code:?}"),
                format!("{:?}", std::process::ExitCode::SUCCESS),
                "{args:?}"
            );
        }
    }

    #[test]
    fn commands_run_against_csv_fixture() {
        let (dir, config) = fixture("");
        let config = config.to_str().unwrap();
        let report = dir.path().join("report.html");
        let report = report.to_str().unwrap();

        for args in [
            vec!["shipscope", "overview", "-c", config],
            vec!["shipscope", "options", "-c", config, "--country", "Japan"],
            vec!["shipscope", "search", "-c", config, "--min-containers", "100"],
            vec!["shipscope", "analyze", "-c", config, "-e", "Hanil Steel", "-o", report],
            vec!["shipscope", "validate", "-c", config],
        ] {
            let code = cli::run(Cli::try_parse_from(&args).unwrap());
            assert_eq!(
                format!("{code:?}"),
                format!("{:?}", std::process::ExitCode::SUCCESS),
                "{args:?}"
            );
        }
        assert!(Path::new(report).exists());
    }

    #[test]
    fn access_list_rejects_unknown_user() {
        let (_dir, config) = fixture("[access]\nallowed_ids = analyst01\n");
        let config = config.to_str().unwrap();

        let args = ["shipscope", "--user", "guest", "overview", "-c", config];
        let denied = cli::run(Cli::try_parse_from(args).unwrap());
        assert_eq!(format!("{denied:?}"), format!("{:?}", std::process::ExitCode::from(6)));

        let allowed = cli::run(
            Cli::try_parse_from(["shipscope", "--user", "analyst01", "overview", "-c", config])
                .unwrap(),
        );
        assert_eq!(format!("{allowed:?}"), format!("{:?}", std::process::ExitCode::SUCCESS));
    }

    #[test]
    fn missing_data_file_exits_with_data_code() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("shipscope.ini");
        std::fs::write(&config, "[data]\npath = /nonexistent/shipments.csv\n").unwrap();
        let code = cli::run(
            Cli::try_parse_from(["shipscope", "overview", "-c", config.to_str().unwrap()]).unwrap(),
        );
        assert_eq!(format!("{code:?}"), format!("{:?}", std::process::ExitCode::from(3)));
    }
}

//! HTTP client tests against a mock prediction service

use std::time::Duration;

use exo_common::config::{load_toml_config, write_toml_config, TomlConfig};
use exo_search::services::{BackendError, HttpBackend, PredictionBackend, ResultSink};
use exo_search::{
    Candidate, Catalog, LightcurveOutcome, PredictionOutcome, PredictionResult, SearchSession,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_candidates_skips_blank_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/autocomplete/kepler"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "suggestions": ["K00752.01", "", "K00753.01"],
            "dataset": "kepler",
            "total_count": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = client(&server).fetch_candidates(Catalog::Kepler).await.unwrap();
    assert_eq!(
        candidates,
        vec![Candidate::from("K00752.01"), Candidate::from("K00753.01")]
    );
}

#[tokio::test]
async fn test_tess_prediction_sends_toi_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predict/tess"))
        .and(body_json(json!({ "toi_name": "1000.01" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "TESS prediction completed",
            "prediction": {
                "is_exoplanet": true,
                "confidence": 0.87,
                "toi_name": "1000.01",
                "model_version": "v2.1"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .predict(Catalog::Tess, &Candidate::from("1000.01"))
        .await
        .unwrap();
    let raw = response.prediction.unwrap();
    assert_eq!(raw.confidence, 0.87);
    assert_eq!(raw.model_version, "v2.1");
}

#[tokio::test]
async fn test_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predict/kepler"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": "KOI name K99999.99 not found in dataset" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .predict(Catalog::Kepler, &Candidate::from("K99999.99"))
        .await
        .unwrap_err();
    match err {
        BackendError::ApiError(status, message) => {
            assert_eq!(status, 404);
            assert_eq!(message, "KOI name K99999.99 not found in dataset");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/autocomplete/tess"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_candidates(Catalog::Tess).await.unwrap_err();
    assert!(matches!(err, BackendError::ParseError(_)));
}

#[tokio::test]
async fn test_lightcurve_url_is_joined_to_base() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/lightcurve/generate"))
        .and(body_json(json!({ "koi_name": "K00752.01" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "url": "/api/lightcurve/K00752_01.png",
            "filename": "K00752_01.png",
            "title": "Light Curve for K00752.01"
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .generate_lightcurve(&Candidate::from("K00752.01"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(
        response.url.as_deref(),
        Some(format!("{}/api/lightcurve/K00752_01.png", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_save_posts_normalized_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predictions/save"))
        .and(body_partial_json(json!({
            "exoplanet_id": "K00752.01",
            "dataset": "kepler",
            "prediction": {
                "confidence": 91.17,
                "is_exoplanet": true,
                "model_version": "v1.0"
            },
            "nasa_classification": "CONFIRMED"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = PredictionResult {
        candidate: Candidate::from("K00752.01"),
        catalog: Catalog::Kepler,
        confidence_percent: 91.17,
        is_exoplanet: true,
        model_version: "v1.0".to_string(),
        external_classification: "CONFIRMED".to_string(),
        requested_at: exo_common::time::now(),
    };
    client(&server).save_prediction(&result).await.unwrap();
}

#[tokio::test]
async fn test_save_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predictions/save"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database unavailable" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = PredictionResult {
        candidate: Candidate::from("1000.01"),
        catalog: Catalog::Tess,
        confidence_percent: 87.0,
        is_exoplanet: true,
        model_version: "v2.1".to_string(),
        external_classification: "UNKNOWN".to_string(),
        requested_at: exo_common::time::now(),
    };
    let err = client(&server).save_prediction(&result).await.unwrap_err();
    match err {
        BackendError::ApiError(status, message) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/autocomplete/kepler"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "suggestions": ["K00752.01", "K00752.02"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/predict/kepler"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prediction": {
                "is_exoplanet": false,
                "confidence": 0.123456,
                "koi_name": "K00752.02",
                "model_version": "v1.0"
            },
            "nasa_classification": "FALSE POSITIVE"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/predictions/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/lightcurve/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "url": "/api/lightcurve/K00752_02.png"
        })))
        .mount(&server)
        .await;

    // Config round trip through a file, as the binary does
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("exo-search.toml");
    let config = TomlConfig {
        backend_url: Some(server.uri()),
        request_timeout_secs: 5,
        ..TomlConfig::default()
    };
    write_toml_config(&config, &config_path).unwrap();
    let config = load_toml_config(&config_path).unwrap();

    let session = SearchSession::connect(config.backend_url.as_deref().unwrap(), &config).unwrap();
    session.switch_catalog(Catalog::Kepler).await.unwrap();
    session.input("752.02").await;
    session.commit_exact().await.unwrap();
    assert!(session.selection().await.candidate().is_none());

    session.input("k00752.02").await;
    assert_eq!(
        session.commit_exact().await.unwrap(),
        Some(Candidate::from("K00752.02"))
    );

    let PredictionOutcome::Succeeded(result) = session.predict().await.unwrap() else {
        panic!("prediction did not succeed");
    };
    assert_eq!(result.confidence_percent, 12.35);
    assert!(!result.is_exoplanet);
    assert_eq!(result.external_classification, "FALSE POSITIVE");

    let LightcurveOutcome::Succeeded(artifact) = session.generate_lightcurve().await.unwrap()
    else {
        panic!("lightcurve did not succeed");
    };
    assert_eq!(artifact.filename, "K00752_02.png");
    assert_eq!(artifact.title, "Lightcurve for K00752.02");
    assert!(artifact.url.starts_with(&server.uri()));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = backend.fetch_candidates(Catalog::Kepler).await.unwrap_err();
    assert!(matches!(err, BackendError::NetworkError(_)));
}

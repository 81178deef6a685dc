//! Solver gateway tests against a mocked solving service
//!
//! wiremock stands in for the WSP solving service so every failure class
//! can be produced deterministically.

use serde_json::json;
use wsp_workbench::config::{MatrixEncoding, SolverConfig};
use wsp_workbench::solver::{GatewayError, HttpSolverGateway, SolveRequest, SolverGateway, StepPair};
use wsp_workbench::SolverType;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock solving service
struct SolverServiceMock {
    server: MockServer,
}

impl SolverServiceMock {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn gateway(&self, encoding: MatrixEncoding) -> HttpSolverGateway {
        HttpSolverGateway::new(SolverConfig {
            base_url: format!("{}/api", self.server.uri()),
            timeout_secs: 2,
            matrix_encoding: encoding,
            ..SolverConfig::default()
        })
        .unwrap()
    }

    async fn mock_solve(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/wsp/solve"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}

fn request() -> SolveRequest {
    SolveRequest {
        num_steps: 3,
        num_users: 2,
        authorized: vec![vec![true, false], vec![false, true], vec![true, true]],
        must_same_constraints: vec![StepPair::new(0, 2)],
        must_different_constraints: vec![StepPair::new(0, 1)],
        solver_type: SolverType::Sat,
    }
}

#[tokio::test]
async fn test_solve_parses_successful_response() {
    let mock = SolverServiceMock::new().await;
    mock.mock_solve(ResponseTemplate::new(200).set_body_json(json!({
        "solutionFound": true,
        "assignment": [0, 1, 0],
        "solvingTimeMs": 12.5,
        "solverUsed": "SAT",
        "message": "Solution found",
        "timestamp": "2024-05-01T10:00:00Z"
    })))
    .await;

    let response = mock
        .gateway(MatrixEncoding::Boolean)
        .solve(&request())
        .await
        .unwrap();

    assert!(response.solution_found);
    assert_eq!(response.assignment, vec![0, 1, 0]);
    assert_eq!(response.solver_used, "SAT");
    assert_eq!(response.timestamp.as_deref(), Some("2024-05-01T10:00:00Z"));
}

#[tokio::test]
async fn test_no_solution_is_a_response_not_an_error() {
    let mock = SolverServiceMock::new().await;
    mock.mock_solve(ResponseTemplate::new(200).set_body_json(json!({
        "solutionFound": false,
        "assignment": null,
        "solvingTimeMs": 3,
        "solverUsed": "CSP",
        "message": "No solution exists"
    })))
    .await;

    let response = mock
        .gateway(MatrixEncoding::Boolean)
        .solve(&request())
        .await
        .unwrap();

    assert!(!response.solution_found);
    assert!(response.assignment.is_empty());
    assert!(response.timestamp.is_none());
}

#[tokio::test]
async fn test_request_body_uses_wire_names() {
    let mock = SolverServiceMock::new().await;
    Mock::given(method("POST"))
        .and(path("/api/wsp/solve"))
        .and(body_json(json!({
            "numSteps": 3,
            "numUsers": 2,
            "authorized": [[true, false], [false, true], [true, true]],
            "mustSameConstraints": [{"step1": 0, "step2": 2}],
            "mustDifferentConstraints": [{"step1": 0, "step2": 1}],
            "solverType": "SAT"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"solutionFound": false})),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.gateway(MatrixEncoding::Boolean)
        .solve(&request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_integer_encoding_sends_numeric_matrix() {
    let mock = SolverServiceMock::new().await;
    Mock::given(method("POST"))
        .and(path("/api/wsp/solve"))
        .and(body_json(json!({
            "numSteps": 3,
            "numUsers": 2,
            "authorized": [[1, 0], [0, 1], [1, 1]],
            "mustSameConstraints": [{"step1": 0, "step2": 2}],
            "mustDifferentConstraints": [{"step1": 0, "step2": 1}],
            "solverType": "SAT"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"solutionFound": false})),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.gateway(MatrixEncoding::Integer)
        .solve(&request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let mock = SolverServiceMock::new().await;
    mock.mock_solve(ResponseTemplate::new(500).set_body_string("solver crashed"))
        .await;

    let err = mock
        .gateway(MatrixEncoding::Boolean)
        .solve(&request())
        .await
        .unwrap_err();

    match &err {
        GatewayError::Server { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "solver crashed");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_malformed_body_is_protocol_error() {
    let mock = SolverServiceMock::new().await;
    mock.mock_solve(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .await;

    let err = mock
        .gateway(MatrixEncoding::Boolean)
        .solve(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Protocol { .. }));
    assert!(!err.is_unavailable());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let server = MockServer::start().await;
    let base_url = format!("{}/api", server.uri());
    drop(server);

    let gateway = HttpSolverGateway::new(SolverConfig {
        base_url,
        timeout_secs: 2,
        ..SolverConfig::default()
    })
    .unwrap();

    let err = gateway.solve(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_health_and_supported_solvers() {
    let mock = SolverServiceMock::new().await;
    Mock::given(method("GET"))
        .and(path("/api/wsp/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("WSP API is running"))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/wsp/solvers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["SAT", "CSP", "QUANTUM"])))
        .mount(&mock.server)
        .await;

    let gateway = mock.gateway(MatrixEncoding::Boolean);
    assert_eq!(gateway.health().await.unwrap(), "WSP API is running");
    assert_eq!(
        gateway.supported_solvers().await.unwrap(),
        vec![SolverType::Sat, SolverType::Csp]
    );
}

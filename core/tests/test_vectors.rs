//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected outcomes. Simulated responses go through `normalize` first,
//! exactly as the transport would, so error vectors cover message handling
//! too. Results are compared as parsed values, not raw strings.

use order_core::{
    normalize, ApiError, ApiResult, HttpMethod, HttpRequest, HttpResponse, NewOrder, Order,
    OrderClient, OrderStatus,
};

const BASE_URL: &str = "http://localhost:8088/api";

fn client() -> OrderClient {
    OrderClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (
                arr[0].as_str().unwrap().to_string(),
                arr[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn check_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");
    assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");
    assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
}

fn simulated(case: &serde_json::Value) -> ApiResult<String> {
    let sim = &case["simulated_response"];
    normalize(HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    })
}

/// Compare a result against `expected_result` or `expected_error`.
fn check_outcome<T>(name: &str, case: &serde_json::Value, result: ApiResult<T>)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    if let Some(expected_error) = case.get("expected_error") {
        let err = result.unwrap_err();
        match expected_error["kind"].as_str().unwrap() {
            "Server" => {
                let expected = ApiError::Server {
                    status: expected_error["status"].as_u64().unwrap() as u16,
                    message: expected_error["message"].as_str().unwrap().to_string(),
                };
                assert_eq!(err, expected, "{name}: error");
            }
            "Decode" => assert!(matches!(err, ApiError::Decode(_)), "{name}: expected Decode"),
            other => panic!("{name}: unknown expected_error kind: {other}"),
        }
    } else if let Some(expected_result) = case.get("expected_result") {
        let value = result.unwrap();
        let expected: T = serde_json::from_value(expected_result.clone()).unwrap();
        assert_eq!(value, expected, "{name}: parsed result");
    } else {
        assert!(result.is_ok(), "{name}: expected success");
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let raw = include_str!("../../test-vectors/list.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let req = c.build_list_orders();
        check_request(name, &req, &case["expected_request"]);

        let result = simulated(case).and_then(|payload| c.parse_list_orders(&payload));
        check_outcome::<Vec<Order>>(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let raw = include_str!("../../test-vectors/create.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: NewOrder = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_order(&input);
        check_request(name, &req, &case["expected_request"]);

        let result = simulated(case).and_then(|payload| c.parse_create_order(&payload));
        check_outcome::<Order>(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_test_vectors() {
    let raw = include_str!("../../test-vectors/status.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_i64().unwrap();
        let status: OrderStatus = case["input_status"].as_str().unwrap().parse().unwrap();

        let req = c.build_set_order_status(id, status);
        check_request(name, &req, &case["expected_request"]);

        let result = simulated(case).and_then(|payload| c.parse_set_order_status(&payload));
        check_outcome::<Order>(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let raw = include_str!("../../test-vectors/delete.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_i64().unwrap();

        let req = c.build_delete_order(id);
        check_request(name, &req, &case["expected_request"]);

        let result = simulated(case).and_then(|payload| c.parse_delete_order(&payload));
        check_outcome::<()>(name, case, result);
    }
}

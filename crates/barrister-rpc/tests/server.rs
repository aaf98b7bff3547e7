use crate::support::new_user;
use crate::support::user_server;
use crate::support::ScriptedHandler;
use crate::support::SharedScriptedHandler;
use barrister_parser::Parser;
use barrister_rpc::Contract;
use barrister_rpc::Handler;
use barrister_rpc::RpcError;
use barrister_rpc::Server;
use barrister_rpc::ERR_INVALID_PARAMS;
use barrister_rpc::ERR_INVALID_REQ;
use barrister_rpc::ERR_INVALID_RESP;
use barrister_rpc::ERR_METHOD_NOT_FOUND;
use barrister_rpc::ERR_PARSE;
use barrister_rpc::ERR_UNKNOWN;
use pretty_assertions::assert_eq;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;

const CALC_IDL: &str = "interface MyService {
    add(a int, b int) int
    log(msg string)
}";

struct CalcHandler;

impl Handler for CalcHandler {
    fn call(&self, function: &str, params: &[Value]) -> Result<Value, RpcError> {
        match function {
            "add" => {
                let a = params[0].as_i64().expect("validated");
                let b = params[1].as_i64().expect("validated");
                Ok(json!(a + b))
            }
            "log" => Ok(Value::Null),
            _ => panic!("unreachable with request validation on"),
        }
    }
}

fn calc_server() -> Server {
    let doc = Parser::new(CALC_IDL).parse().unwrap();
    let mut server = Server::new(Arc::new(Contract::from_document(doc)));
    server.add_handler("MyService", Box::new(CalcHandler)).unwrap();
    server
}

fn error_code(response: &Value) -> i64 {
    response["error"]["code"].as_i64().expect("error response")
}

#[test]
fn add_returns_sum_with_id_echoed() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": "x", "method": "MyService.add", "params": [2, 3],
    }));
    assert_eq!(resp, json!({"jsonrpc": "2.0", "id": "x", "result": 5}));
}

#[test]
fn numeric_ids_are_echoed() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 7, "method": "MyService.add", "params": [1, 1],
    }));
    assert_eq!(resp["id"], json!(7));
}

#[test]
fn missing_id_becomes_null() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "method": "MyService.add", "params": [1, 1],
    }));
    assert_eq!(resp["id"], Value::Null);
}

#[test]
fn invalid_param_type_names_function_and_param() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": "x", "method": "MyService.add", "params": [2, "three"],
    }));
    assert_eq!(error_code(&resp), ERR_INVALID_PARAMS);
    let message = resp["error"]["message"].as_str().unwrap();
    assert!(message.contains("MyService.add"), "got: {message}");
    assert!(message.contains("'b'"), "got: {message}");
}

#[test]
fn wrong_arity_is_invalid_params() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "MyService.add", "params": [2],
    }));
    assert_eq!(error_code(&resp), ERR_INVALID_PARAMS);
    assert_eq!(
        resp["error"]["message"],
        json!("Function 'MyService.add' expects 2 param(s). 1 given.")
    );
}

#[test]
fn notification_is_invoked_and_answered_with_null_result() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": "n1", "method": "MyService.log", "params": ["hello"],
    }));
    assert_eq!(resp, json!({"jsonrpc": "2.0", "id": "n1", "result": null}));
}

#[test]
fn missing_method_is_invalid_request() {
    let server = calc_server();
    let resp = server.call(&json!({"jsonrpc": "2.0", "id": 1}));
    assert_eq!(error_code(&resp), ERR_INVALID_REQ);
}

#[test]
fn method_without_separator_is_not_found() {
    let server = calc_server();
    let resp = server.call(&json!({"jsonrpc": "2.0", "id": 1, "method": "add"}));
    assert_eq!(error_code(&resp), ERR_METHOD_NOT_FOUND);
    assert_eq!(resp["error"]["message"], json!("Method not found: add"));
}

#[test]
fn unknown_interface_is_not_found() {
    let server = calc_server();
    let resp = server.call(&json!({"jsonrpc": "2.0", "id": 1, "method": "Nope.add"}));
    assert_eq!(error_code(&resp), ERR_METHOD_NOT_FOUND);
}

#[test]
fn unknown_function_is_not_found() {
    let server = calc_server();
    let resp = server.call(&json!({"jsonrpc": "2.0", "id": 1, "method": "MyService.divide"}));
    assert_eq!(error_code(&resp), ERR_METHOD_NOT_FOUND);
}

#[test]
fn non_object_request_is_invalid() {
    let server = calc_server();
    let resp = server.call(&json!("hi"));
    assert_eq!(error_code(&resp), ERR_INVALID_REQ);
    assert_eq!(resp["id"], Value::Null);
}

#[test]
fn non_array_params_are_invalid() {
    let server = calc_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "MyService.add", "params": {"a": 2},
    }));
    assert_eq!(error_code(&resp), ERR_INVALID_REQ);
}

#[test]
fn empty_batch_is_a_single_error() {
    let server = calc_server();
    let resp = server.call(&json!([]));
    assert_eq!(error_code(&resp), ERR_INVALID_REQ);
    assert_eq!(resp["id"], Value::Null);
}

#[test]
fn batch_responses_match_request_order_and_length() {
    let server = calc_server();
    let resp = server.call(&json!([
        {"jsonrpc": "2.0", "id": "a", "method": "MyService.add", "params": [1, 1]},
        {"jsonrpc": "2.0", "id": "b", "method": "MyService.add", "params": [2, 2]},
        "not a call",
        {"jsonrpc": "2.0", "id": "c", "method": "MyService.add", "params": [3, 3]},
    ]));
    let responses = resp.as_array().expect("batch response is an array");
    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0], json!({"jsonrpc": "2.0", "id": "a", "result": 2}));
    assert_eq!(responses[1], json!({"jsonrpc": "2.0", "id": "b", "result": 4}));
    assert_eq!(error_code(&responses[2]), ERR_INVALID_REQ);
    assert_eq!(responses[3], json!({"jsonrpc": "2.0", "id": "c", "result": 6}));
}

#[test]
fn barrister_idl_returns_the_contract() {
    let server = calc_server();
    let resp = server.call(&json!({"jsonrpc": "2.0", "id": 1, "method": "barrister-idl"}));
    let expected = serde_json::to_value(server.contract().document()).unwrap();
    assert_eq!(resp["result"], expected);
    assert!(resp["result"].is_array());
}

#[test]
fn handle_bytes_round_trips() {
    let server = calc_server();
    let out = server.handle_bytes(
        br#"{"jsonrpc":"2.0","id":"x","method":"MyService.add","params":[2,3]}"#,
    );
    let resp: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(resp["result"], json!(5));
}

#[test]
fn handle_bytes_rejects_malformed_json() {
    let server = calc_server();
    let out = server.handle_bytes(b"{not json");
    let resp: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(error_code(&resp), ERR_PARSE);
    assert_eq!(resp["id"], Value::Null);
}

#[test]
fn handler_rpc_errors_pass_through_verbatim() {
    struct Failing;
    impl Handler for Failing {
        fn call(&self, _function: &str, _params: &[Value]) -> Result<Value, RpcError> {
            Err(RpcError::with_data(1001, "quota exceeded", json!({"limit": 10})))
        }
    }

    let doc = Parser::new(CALC_IDL).parse().unwrap();
    let mut server = Server::new(Arc::new(Contract::from_document(doc)));
    server.add_handler("MyService", Box::new(Failing)).unwrap();

    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "MyService.add", "params": [1, 2],
    }));
    assert_eq!(
        resp["error"],
        json!({"code": 1001, "message": "quota exceeded", "data": {"limit": 10}})
    );
}

#[test]
fn panicking_handler_becomes_unknown_error() {
    struct Panicking;
    impl Handler for Panicking {
        fn call(&self, _function: &str, _params: &[Value]) -> Result<Value, RpcError> {
            panic!("boom");
        }
    }

    let doc = Parser::new(CALC_IDL).parse().unwrap();
    let mut server = Server::new(Arc::new(Contract::from_document(doc)));
    server.add_handler("MyService", Box::new(Panicking)).unwrap();

    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "MyService.add", "params": [1, 2],
    }));
    assert_eq!(error_code(&resp), ERR_UNKNOWN);
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("boom"));
}

#[test]
fn invalid_enum_in_response_is_rejected() {
    let idl = "enum Status { ok invalid error }
struct Result {
    status Status
}
interface StatusService {
    check() Result
}";
    let doc = Parser::new(idl).parse().unwrap();
    let handler = ScriptedHandler::new(json!({"status": "blah"}));
    let mut server = Server::new(Arc::new(Contract::from_document(doc)));
    server.add_handler("StatusService", Box::new(SharedScriptedHandler(handler))).unwrap();

    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "StatusService.check", "params": [],
    }));
    assert_eq!(error_code(&resp), ERR_INVALID_RESP);
}

#[test]
fn request_validation_can_be_disabled() {
    struct Stringly;
    impl Handler for Stringly {
        fn call(&self, _function: &str, params: &[Value]) -> Result<Value, RpcError> {
            Ok(json!(params.len() as i64))
        }
    }

    let doc = Parser::new(CALC_IDL).parse().unwrap();
    let mut server =
        Server::new(Arc::new(Contract::from_document(doc))).validate_request(false);
    server.add_handler("MyService", Box::new(Stringly)).unwrap();

    // wrong types and wrong arity reach the handler untouched
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "MyService.add", "params": ["x"],
    }));
    assert_eq!(resp["result"], json!(1));
}

#[test]
fn add_handler_rejects_unknown_interface() {
    let mut server = Server::new(user_server().contract().clone());
    let err = server
        .add_handler("NoSuchService", Box::new(CalcHandler))
        .unwrap_err();
    assert_eq!(err.code, ERR_INVALID_REQ);
}

#[test]
fn user_service_round_trip_and_app_error() {
    let server = user_server();
    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "UserService.create",
        "params": [new_user("u1", "a@b.com")],
    }));
    assert!(resp.get("result").is_some(), "got: {resp}");

    let resp = server.call(&json!({
        "jsonrpc": "2.0", "id": 2, "method": "UserService.get", "params": ["missing"],
    }));
    assert_eq!(error_code(&resp), 1000);
}

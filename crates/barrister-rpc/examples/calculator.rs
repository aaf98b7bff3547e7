//! In-process calculator service: parse an IDL, serve it, call it.
//!
//! Run with: `cargo run --example calculator`

use barrister_parser::Parser;
use barrister_rpc::Client;
use barrister_rpc::Contract;
use barrister_rpc::Handler;
use barrister_rpc::InProcTransport;
use barrister_rpc::RpcError;
use barrister_rpc::Server;
use barrister_rpc::ERR_METHOD_NOT_FOUND;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;

const IDL: &str = "
interface Calculator {
    add(a float, b float) float
    subtract(a float, b float) float
}
";

struct Calculator;

impl Handler for Calculator {
    fn call(&self, function: &str, params: &[Value]) -> Result<Value, RpcError> {
        let a = params[0].as_f64().expect("validated by the server");
        let b = params[1].as_f64().expect("validated by the server");
        match function {
            "add" => Ok(json!(a + b)),
            "subtract" => Ok(json!(a - b)),
            other => Err(RpcError::new(
                ERR_METHOD_NOT_FOUND,
                format!("Calculator: Unknown function: '{other}'"),
            )),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let doc = Parser::new(IDL).parse()?;
    let contract = Arc::new(Contract::from_document(doc));

    let mut server = Server::new(contract);
    server.add_handler("Calculator", Box::new(Calculator))?;

    let client = Client::connect(InProcTransport::new(Arc::new(server)))?;
    let calc = client.interface("Calculator")?;

    let sum = calc.call("add", vec![json!(2), json!(3)])?;
    let diff = calc.call("subtract", vec![json!(10), json!(4.5)])?;
    println!("2 + 3 = {sum}");
    println!("10 - 4.5 = {diff}");

    Ok(())
}

//! Shared fixtures: a user-management contract and an in-memory service
//! implementation.

use barrister_parser::Parser;
use barrister_rpc::Contract;
use barrister_rpc::Handler;
use barrister_rpc::RpcError;
use barrister_rpc::Server;
use barrister_rpc::ERR_METHOD_NOT_FOUND;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

pub const USER_IDL: &str = "
struct User {
    userId string
    password string
    email string
    emailVerified bool
    dateCreated int
    age float [optional]
}

enum Status {
    ok
    invalid
    error
}

struct Response {
    status Status
    message string
}

struct CountResponse extends Response {
    count int
}

struct CreateUserResponse extends Response {
    userId string
}

struct UserResponse extends Response {
    user User
}

struct UsersResponse extends Response {
    users []User
}

interface UserService {
    get(userId string) UserResponse
    create(user User) CreateUserResponse
    update(user User) Response
    validateEmail(userId string) Response
    changePassword(userId string, oldPass string, newPass string) Response
    countUsers() CountResponse
    getAll(userIds []string) UsersResponse
}
";

pub fn user_contract() -> Arc<Contract> {
    let doc = Parser::new(USER_IDL).parse().expect("fixture IDL is valid");
    Arc::new(Contract::from_document(doc))
}

pub fn user_server() -> Arc<Server> {
    let mut server = Server::new(user_contract());
    server
        .add_handler("UserService", Box::new(UserService::default()))
        .expect("UserService is in the contract");
    Arc::new(server)
}

pub fn new_user(user_id: &str, email: &str) -> Value {
    json!({
        "userId": user_id,
        "password": "pw",
        "email": email,
        "emailVerified": false,
        "dateCreated": 1,
        "age": 3.3,
    })
}

#[derive(Default)]
pub struct UserService {
    users: Mutex<HashMap<String, Value>>,
    next_id: AtomicU64,
}

impl UserService {
    fn response(status: &str, message: &str) -> Value {
        json!({ "status": status, "message": message })
    }
}

impl Handler for UserService {
    fn call(&self, function: &str, params: &[Value]) -> Result<Value, RpcError> {
        match function {
            "get" => {
                let user_id = params[0].as_str().unwrap_or_default();
                let users = self.users.lock().unwrap();
                let user = users.get(user_id).cloned().ok_or_else(|| {
                    RpcError::new(1000, format!("no such user: {user_id}"))
                })?;
                let mut resp = Self::response("ok", "user found");
                resp["user"] = user;
                Ok(resp)
            }
            "create" => {
                let user_id = format!("user-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
                let mut user = params[0].clone();
                user["userId"] = json!(user_id);
                self.users.lock().unwrap().insert(user_id.clone(), user);
                let mut resp = Self::response("ok", "user created");
                resp["userId"] = json!(user_id);
                Ok(resp)
            }
            "update" => {
                let user = params[0].clone();
                let user_id = user["userId"].as_str().unwrap_or_default().to_string();
                self.users.lock().unwrap().insert(user_id, user);
                Ok(Self::response("ok", "user updated"))
            }
            "validateEmail" => Ok(Self::response("ok", "email validated")),
            "changePassword" => Ok(Self::response("ok", "password updated")),
            "countUsers" => {
                let mut resp = Self::response("ok", "ok");
                resp["count"] = json!(self.users.lock().unwrap().len());
                Ok(resp)
            }
            "getAll" => {
                let mut resp = Self::response("ok", "users here");
                resp["users"] = json!([]);
                Ok(resp)
            }
            other => Err(RpcError::new(
                ERR_METHOD_NOT_FOUND,
                format!("UserService: Unknown function: '{other}'"),
            )),
        }
    }
}

/// Replays whatever value it was last told to; lets tests drive invalid
/// responses through a validating server.
pub struct ScriptedHandler {
    pub next: Mutex<Value>,
}

impl ScriptedHandler {
    pub fn new(initial: Value) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(initial),
        })
    }

    pub fn set(&self, value: Value) {
        *self.next.lock().unwrap() = value;
    }
}

/// Local newtype so `Handler` (foreign to this test crate) can be
/// implemented for a shared `Arc<ScriptedHandler>` without violating the
/// orphan rule.
pub struct SharedScriptedHandler(pub Arc<ScriptedHandler>);

impl Handler for SharedScriptedHandler {
    fn call(&self, _function: &str, _params: &[Value]) -> Result<Value, RpcError> {
        Ok(self.0.next.lock().unwrap().clone())
    }
}

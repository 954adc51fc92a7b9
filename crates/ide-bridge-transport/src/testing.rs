//! Test utilities: an in-process stand-in for the editor-side bridge.
//!
//! `FakeBridge` holds a small remote object graph and answers `inspect`,
//! `eval`, `executeCommand`, `getCommands` and `queryApi` the way the
//! editor plugin does, so higher layers can be tested without an editor.
//!
//! # Example
//!
//! ```ignore
//! use ide_bridge_transport::testing::{FakeBridge, FakeMember};
//!
//! let bridge = FakeBridge::new()
//!     .member("vscode", FakeMember::object([("version", FakeMember::value("1.90"))]));
//! let transport = bridge.into_transport();
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use ide_bridge_core::{Request, TransportError};
use serde_json::{Map, Value, json};

use crate::memory::MemoryTransport;

/// One member of the fake remote graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeMember {
    Object(Vec<(String, FakeMember)>),
    Function(Vec<String>),
    Value(Value),
}

impl FakeMember {
    pub fn object<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, Self)>,
        S: Into<String>,
    {
        Self::Object(members.into_iter().map(|(n, m)| (n.into(), m)).collect())
    }

    pub fn function<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Function(params.into_iter().map(Into::into).collect())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Value(Value::String(_)) => "string",
            Self::Value(Value::Number(_)) => "number",
            Self::Value(Value::Bool(_)) => "boolean",
            Self::Value(Value::Null) => "undefined",
            // Containers only exist as plain data here.
            Self::Value(_) => "data",
        }
    }

    fn descriptor(&self, name: &str) -> Value {
        let mut desc = json!({"name": name, "type": self.type_tag()});
        if let Self::Function(params) = self {
            desc["params"] = json!(params);
        }
        desc
    }
}

/// Everything the fake bridge was asked to run, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeLog {
    /// Expressions received through `eval`.
    pub evaluated: Vec<String>,
    /// Commands received through `executeCommand`, with their arguments.
    pub commands: Vec<(String, Vec<Value>, Map<String, Value>)>,
}

/// In-process fake of the editor-side bridge.
#[derive(Debug, Clone, Default)]
pub struct FakeBridge {
    root: Vec<(String, FakeMember)>,
    command_names: Vec<String>,
    log: Arc<Mutex<BridgeLog>>,
}

impl FakeBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level member.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, member: FakeMember) -> Self {
        self.root.push((name.into(), member));
        self
    }

    /// Declare the names returned by `getCommands`.
    #[must_use]
    pub fn commands<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Shared handle on the request log; stays valid after the bridge is
    /// moved into a transport.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<BridgeLog>> {
        Arc::clone(&self.log)
    }

    /// Wrap the bridge in a [`MemoryTransport`].
    #[must_use]
    pub fn into_transport(mut self) -> MemoryTransport {
        MemoryTransport::new(move |raw| Ok(self.handle_raw(raw)))
    }

    /// Wrap the bridge in a transport that fails every request whose raw
    /// text contains `needle`.
    #[must_use]
    pub fn into_failing_transport(mut self, needle: &'static str) -> MemoryTransport {
        MemoryTransport::new(move |raw| {
            if raw.contains(needle) {
                Err(TransportError::ConnectionLost("injected failure".to_string()))
            } else {
                Ok(self.handle_raw(raw))
            }
        })
    }

    /// Answer one raw request frame.
    pub fn handle_raw(&mut self, raw: &str) -> String {
        match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(&request).to_string(),
            Err(e) => error(&format!("bad request: {e}")).to_string(),
        }
    }

    /// Answer one request.
    pub fn handle(&mut self, request: &Request) -> Value {
        match request.command.as_str() {
            "inspect" => self.inspect(request.args.first().and_then(Value::as_str)),
            "eval" => match request.args.first().and_then(Value::as_str) {
                Some(expr) => self.eval(expr),
                None => error("eval needs an expression"),
            },
            "executeCommand" => self.execute_command(request),
            "getCommands" => json!(self.command_names),
            "queryApi" => {
                let target = request.args.first().and_then(Value::as_str).unwrap_or("");
                self.inspect(Some(target))
            }
            other => error(&format!("unknown command {other}")),
        }
    }

    fn inspect(&self, path: Option<&str>) -> Value {
        let members = match path.filter(|p| !p.is_empty()) {
            None => &self.root,
            Some(p) => match lookup(&self.root, p) {
                Some(FakeMember::Object(members)) => members,
                Some(_) => return error(&format!("{p} is not an object")),
                None => return error(&format!("{p} is not defined")),
            },
        };
        let mut map = Map::new();
        for (name, member) in members {
            map.insert(name.clone(), member.descriptor(name));
        }
        json!({"status": "OK", "members": map})
    }

    fn eval(&mut self, expr: &str) -> Value {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .evaluated
            .push(expr.to_string());
        let body = expr.trim().trim_end_matches(';').trim();

        if let Some((lhs, rhs)) = body.split_once(" = ") {
            if is_path(lhs) {
                return match serde_json::from_str::<Value>(rhs) {
                    Ok(value) => {
                        assign(&mut self.root, lhs, value.clone());
                        json!({"status": "OK", "result": value})
                    }
                    Err(e) => error(&format!("SyntaxError: {e}")),
                };
            }
        }

        if let Some((callee, rest)) = body.split_once('(') {
            if is_path(callee) && rest.ends_with(')') {
                let args_text = &rest[..rest.len() - 1];
                return match (
                    lookup(&self.root, callee),
                    serde_json::from_str::<Value>(&format!("[{args_text}]")),
                ) {
                    (Some(FakeMember::Function(_)), Ok(args)) => {
                        json!({"status": "OK", "result": {"called": callee, "args": args}})
                    }
                    (Some(_), _) => error(&format!("TypeError: {callee} is not a function")),
                    (None, _) => error(&format!("ReferenceError: {callee} is not defined")),
                };
            }
        }

        match lookup(&self.root, body) {
            Some(FakeMember::Value(v)) => json!({"status": "OK", "result": v}),
            Some(FakeMember::Object(_)) => json!({"status": "OK", "result": "[object Object]"}),
            Some(FakeMember::Function(_)) => json!({"status": "OK", "result": "[Function]"}),
            None => error(&format!("ReferenceError: {body} is not defined")),
        }
    }

    fn execute_command(&mut self, request: &Request) -> Value {
        let Some(name) = request.args.first().and_then(Value::as_str) else {
            return error("executeCommand needs a command name");
        };
        let args = request.args[1..].to_vec();
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commands
            .push((name.to_string(), args.clone(), request.kwargs.clone()));
        json!({"status": "OK", "command": name, "args": args, "kwargs": request.kwargs})
    }
}

fn error(message: &str) -> Value {
    json!({"status": "ERROR", "message": message})
}

fn is_path(text: &str) -> bool {
    !text.is_empty()
        && text
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
}

fn lookup<'a>(members: &'a [(String, FakeMember)], path: &str) -> Option<&'a FakeMember> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = &members.iter().find(|(n, _)| n == first)?.1;
    for seg in segments {
        let FakeMember::Object(children) = current else {
            return None;
        };
        current = &children.iter().find(|(n, _)| n == seg)?.1;
    }
    Some(current)
}

fn assign(members: &mut Vec<(String, FakeMember)>, path: &str, value: Value) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let index = match members.iter().position(|(n, _)| n == head) {
        Some(i) => i,
        None => {
            let fresh = if rest.is_some() {
                FakeMember::Object(Vec::new())
            } else {
                FakeMember::Value(Value::Null)
            };
            members.push((head.to_string(), fresh));
            members.len() - 1
        }
    };
    match (rest, &mut members[index].1) {
        (None, slot) => *slot = FakeMember::Value(value),
        (Some(rest), FakeMember::Object(children)) => assign(children, rest, value),
        (Some(_), _) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> FakeBridge {
        FakeBridge::new().member(
            "root",
            FakeMember::object([
                ("count", FakeMember::value(3)),
                ("fn", FakeMember::function(["a", "b"])),
            ]),
        )
    }

    #[test]
    fn test_inspect_root_and_nested() {
        let mut bridge = bridge();
        let reply = bridge.handle(&Request::new("inspect", vec![]));
        assert_eq!(reply["members"]["root"]["type"], "object");

        let reply = bridge.handle(&Request::new("inspect", vec![json!("root")]));
        assert_eq!(reply["members"]["count"]["type"], "number");
        assert_eq!(reply["members"]["fn"]["params"], json!(["a", "b"]));

        let reply = bridge.handle(&Request::new("inspect", vec![json!("root.count")]));
        assert_eq!(reply["status"], "ERROR");
    }

    #[test]
    fn test_eval_assign_then_read() {
        let mut bridge = bridge();
        let set = Request::new("eval", vec![json!(r#"root.count = "a\"b";"#)]);
        assert_eq!(bridge.handle(&set)["status"], "OK");
        let get = Request::new("eval", vec![json!("root.count;")]);
        assert_eq!(bridge.handle(&get)["result"], "a\"b");
        assert_eq!(bridge.log().lock().unwrap().evaluated.len(), 2);
    }

    #[test]
    fn test_eval_call() {
        let mut bridge = bridge();
        let call = Request::new("eval", vec![json!(r#"root.fn(1, "two", 3.0);"#)]);
        let reply = bridge.handle(&call);
        assert_eq!(reply["result"]["args"], json!([1, "two", 3.0]));

        let bad = Request::new("eval", vec![json!("root.count(1);")]);
        assert_eq!(bridge.handle(&bad)["status"], "ERROR");
    }

    #[test]
    fn test_poisoned_log_keeps_recording() {
        let mut bridge = bridge();
        let log = bridge.log();
        let _ = std::thread::spawn(move || {
            let _guard = log.lock().unwrap();
            panic!("test thread panics while holding the log");
        })
        .join();
        assert!(bridge.log().is_poisoned());

        let get = Request::new("eval", vec![json!("root.count;")]);
        assert_eq!(bridge.handle(&get)["result"], 3);
        let run = Request::new("executeCommand", vec![json!("saveAll")]);
        assert_eq!(bridge.handle(&run)["status"], "OK");

        let log = bridge.log();
        let log = log.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(log.evaluated, ["root.count;"]);
        assert_eq!(log.commands[0].0, "saveAll");
    }
}

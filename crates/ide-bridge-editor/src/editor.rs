//! Project, file and debugger operations.
//!
//! Operations the bridge has no command for fail with
//! `BridgeError::UnsupportedOperation` without sending anything.

use ide_bridge_client::BridgeClient;
use ide_bridge_core::{BridgeError, InstanceStorage, ProcessId, Result, Transport};
use ide_bridge_session::{InstanceRegistry, ProcessProbe};
use ide_bridge_transport::WebSocketTransport;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Remote-controlled editor instance.
pub struct Editor<T> {
    client: BridgeClient<T>,
}

impl Editor<WebSocketTransport> {
    /// Connect to the running instance registered as `project`.
    ///
    /// # Errors
    /// Returns `BridgeError::NoInstance` if no such instance is running.
    pub async fn open_instance<S, P>(registry: &InstanceRegistry<S, P>, project: &str) -> Result<Self>
    where
        S: InstanceStorage,
        P: ProcessProbe,
    {
        Ok(Self::new(registry.connect(project).await?))
    }
}

impl<T: Transport> Editor<T> {
    #[must_use]
    pub const fn new(client: BridgeClient<T>) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &BridgeClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut BridgeClient<T> {
        &mut self.client
    }

    #[must_use]
    pub fn into_client(self) -> BridgeClient<T> {
        self.client
    }

    /// Name of the project being edited (the registry instance name).
    #[must_use]
    pub fn project(&self) -> &str {
        self.client.instance_name()
    }

    /// Open a folder or `.code-workspace` file.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn open_project(&mut self, project: &str) -> Result<Value> {
        self.run("open_workspace", vec![json!(project)], Map::new())
            .await
    }

    /// Open a source file in the current workspace.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn open_code_file(&mut self, location: &str) -> Result<Value> {
        self.run("openTextDocument", vec![json!(location)], Map::new())
            .await
    }

    /// Contents of the file at `location`, as the editor currently holds
    /// them (unsaved changes included).
    ///
    /// The file is opened first, so it becomes the active document.
    ///
    /// # Errors
    /// Returns an error if either request fails, or a protocol error if the
    /// editor does not answer with text.
    pub async fn read(&mut self, location: &str) -> Result<String> {
        self.open_code_file(location).await?;
        let reply = self.client.eval(ACTIVE_TEXT).await?;
        match reply.get("result") {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err(BridgeError::protocol(
                format!("no text returned for {location}"),
                reply.to_string(),
            )),
        }
    }

    /// Replace the contents of the file at `location` with `text`.
    ///
    /// The edit is applied to the open document and left unsaved; follow
    /// with [`save_all`](Self::save_all) to write it to disk.
    ///
    /// # Errors
    /// Returns an error if either request fails or the editor reports failure.
    pub async fn write(&mut self, location: &str, text: &str) -> Result<Value> {
        self.open_code_file(location).await?;
        self.client.eval(&replace_active_text(text)).await
    }

    /// Documents currently open in the workspace.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn files(&mut self) -> Result<Value> {
        self.client.eval("vscode.workspace.textDocuments").await
    }

    /// Save every modified document (untitled ones are left alone).
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn save_all(&mut self) -> Result<Value> {
        let mut kwargs = Map::new();
        kwargs.insert("includeUntitled".to_string(), json!(false));
        self.run("saveAll", Vec::new(), kwargs).await
    }

    /// Close the editor, saving first when `autosave` is set.
    ///
    /// # Errors
    /// Returns an error if saving or closing fails.
    pub async fn close(&mut self, autosave: bool) -> Result<Value> {
        if autosave {
            self.save_all().await?;
        }
        self.run("close", Vec::new(), Map::new()).await
    }

    /// Start the debug configuration called `configuration` (`""` for the
    /// default one) in the workspace root.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn start_debugging(&mut self, configuration: &str) -> Result<Value> {
        let mut kwargs = Map::new();
        kwargs.insert("folder".to_string(), json!("."));
        kwargs.insert("nameOrConfiguration".to_string(), json!(configuration));
        self.run("debug.startDebugging", Vec::new(), kwargs).await
    }

    /// Stop the active debug session.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn stop_debugging(&mut self) -> Result<Value> {
        self.run("debug.stopDebugging", Vec::new(), Map::new())
            .await
    }

    /// Add a breakpoint at `location` (e.g. `main.c:320`).
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn add_breakpoint(&mut self, location: &str) -> Result<Value> {
        self.run("debug.addBreakpoints", vec![json!([location])], Map::new())
            .await
    }

    /// Remove the breakpoint called `name`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn remove_breakpoint(&mut self, name: &str) -> Result<Value> {
        self.run("debug.removeBreakpoints", vec![json!([name])], Map::new())
            .await
    }

    /// The running debug session, or `None` when nothing is being debugged.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn active_debug_session(&mut self) -> Result<Option<Value>> {
        let reply = self
            .run("debug.activeDebugSession", Vec::new(), Map::new())
            .await?;
        let session = reply.get("result").cloned().unwrap_or(Value::Null);
        Ok(is_present(&session).then_some(session))
    }

    /// Start the first launch configuration whose name contains `attach`
    /// (case-insensitive).
    ///
    /// Returns the name of the configuration started, or `None` when the
    /// workspace has no such configuration and nothing was started.
    ///
    /// # Errors
    /// Returns an error if a request fails, or a protocol error if the
    /// launch configurations are not a list.
    pub async fn attach(&mut self) -> Result<Option<String>> {
        let reply = self.client.eval(LAUNCH_CONFIGURATIONS).await?;
        let configurations = match reply.get("result") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(BridgeError::protocol(
                    "launch configurations are not a list",
                    reply.to_string(),
                ));
            }
        };
        let Some(name) = configurations
            .iter()
            .filter_map(|config| config.get("name").and_then(Value::as_str))
            .find(|name| name.to_lowercase().contains("attach"))
            .map(str::to_string)
        else {
            debug!(project = self.project(), "No attach configuration");
            return Ok(None);
        };

        self.start_debugging(&name).await?;
        Ok(Some(name))
    }

    /// Stop the active debug session, if any. For an attach session the
    /// debuggee keeps running.
    ///
    /// Returns whether a session was stopped.
    ///
    /// # Errors
    /// Returns an error if a request fails or the editor reports failure.
    pub async fn detach(&mut self) -> Result<bool> {
        if self.active_debug_session().await?.is_none() {
            return Ok(false);
        }
        self.stop_debugging().await?;
        Ok(true)
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn breakpoints(&self) -> Result<Vec<String>> {
        Err(BridgeError::UnsupportedOperation("listing breakpoints"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn watchpoints(&self) -> Result<Vec<String>> {
        Err(BridgeError::UnsupportedOperation("watchpoints"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn add_watchpoint(&self, _variable: &str, _condition: &str) -> Result<()> {
        Err(BridgeError::UnsupportedOperation("watchpoints"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn remove_watchpoint(&self, _variable: &str) -> Result<()> {
        Err(BridgeError::UnsupportedOperation("watchpoints"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn pause(&self) -> Result<()> {
        Err(BridgeError::UnsupportedOperation("pause"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn resume(&self) -> Result<()> {
        Err(BridgeError::UnsupportedOperation("resume"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn is_paused(&self) -> Result<bool> {
        Err(BridgeError::UnsupportedOperation("pause state"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn call_stack(&self) -> Result<Vec<Value>> {
        Err(BridgeError::UnsupportedOperation("call stack"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn paused_location(&self) -> Result<String> {
        Err(BridgeError::UnsupportedOperation("paused location"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn debugged_pid(&self) -> Result<ProcessId> {
        Err(BridgeError::UnsupportedOperation("debugged process id"))
    }

    /// # Errors
    /// Always `UnsupportedOperation`.
    pub fn wait_exit(&self) -> Result<i32> {
        Err(BridgeError::UnsupportedOperation("wait for exit"))
    }

    async fn run(
        &mut self,
        command: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let reply = self.client.execute(command, args, kwargs).await?;
        debug!(command, %reply, "Editor command finished");
        Ok(reply)
    }
}

const ACTIVE_TEXT: &str = "vscode.window.activeTextEditor.document.getText();";

const LAUNCH_CONFIGURATIONS: &str =
    r#"vscode.workspace.getConfiguration("launch").get("configurations");"#;

/// Expression replacing the whole text of the active editor.
///
/// `text` is embedded as a JSON string, which is also a valid script
/// string literal with newlines and quotes escaped.
fn replace_active_text(text: &str) -> String {
    format!(
        "(editor => editor.edit(edit => edit.replace(\
         new vscode.Range(0, 0, editor.document.lineCount, 0), {})))\
         (vscode.window.activeTextEditor);",
        Value::from(text)
    )
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ide_bridge_core::Request;
    use ide_bridge_transport::MemoryTransport;
    use tokio_test::assert_err;

    use super::*;

    fn editor_replying(reply: Value) -> Editor<MemoryTransport> {
        let transport = MemoryTransport::new(move |_| Ok(reply.to_string()));
        Editor::new(BridgeClient::new(transport).with_instance_name("~/proj"))
    }

    fn ok_editor() -> Editor<MemoryTransport> {
        editor_replying(json!({"status": "OK"}))
    }

    fn editor_with_replies<const N: usize>(replies: [Value; N]) -> Editor<MemoryTransport> {
        Editor::new(BridgeClient::new(MemoryTransport::replying(replies)))
    }

    fn sent(editor: &Editor<MemoryTransport>) -> Vec<Request> {
        editor.client().transport().sent_requests()
    }

    #[tokio::test]
    async fn test_project_operations() {
        let mut editor = ok_editor();
        assert_eq!(editor.project(), "~/proj");

        editor.open_project("/src/other").await.unwrap();
        editor.open_code_file("src/main.rs").await.unwrap();

        let sent = sent(&editor);
        assert_eq!(sent[0].command, "open_workspace");
        assert_eq!(sent[0].args, [json!("/src/other")]);
        assert_eq!(sent[1].command, "openTextDocument");
        assert_eq!(sent[1].args, [json!("src/main.rs")]);
    }

    #[tokio::test]
    async fn test_close_saves_first() {
        let mut editor = ok_editor();
        editor.close(true).await.unwrap();
        editor.close(false).await.unwrap();

        let commands: Vec<_> = sent(&editor).into_iter().map(|r| r.command).collect();
        assert_eq!(commands, ["saveAll", "close", "close"]);
        assert_eq!(sent(&editor)[0].kwargs["includeUntitled"], json!(false));
    }

    #[tokio::test]
    async fn test_debugging_requests() {
        let mut editor = ok_editor();
        editor.start_debugging("Attach").await.unwrap();
        editor.add_breakpoint("test_target.c:320").await.unwrap();
        editor.remove_breakpoint("test_target.c:320").await.unwrap();
        editor.stop_debugging().await.unwrap();

        let sent = sent(&editor);
        assert_eq!(sent[0].command, "debug.startDebugging");
        assert_eq!(sent[0].kwargs["folder"], ".");
        assert_eq!(sent[0].kwargs["nameOrConfiguration"], "Attach");
        assert_eq!(sent[1].command, "debug.addBreakpoints");
        assert_eq!(sent[1].args, [json!(["test_target.c:320"])]);
        assert_eq!(sent[2].command, "debug.removeBreakpoints");
        assert_eq!(sent[3].command, "debug.stopDebugging");
    }

    #[tokio::test]
    async fn test_active_debug_session() {
        let mut idle = editor_replying(json!({"status": "OK", "result": null}));
        assert!(idle.active_debug_session().await.unwrap().is_none());

        let mut busy =
            editor_replying(json!({"status": "OK", "result": {"id": "s1", "name": "Attach"}}));
        let session = busy.active_debug_session().await.unwrap().unwrap();
        assert_eq!(session["name"], "Attach");
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let mut editor = editor_replying(json!({"status": "ERROR", "message": "no folder"}));
        let err = assert_err!(editor.start_debugging("").await);
        assert!(matches!(err, BridgeError::Rpc { .. }));
    }

    #[tokio::test]
    async fn test_files_uses_eval() {
        let mut editor = ok_editor();
        editor.files().await.unwrap();
        let sent = sent(&editor);
        assert_eq!(sent[0].command, "eval");
        assert_eq!(sent[0].args, [json!("vscode.workspace.textDocuments")]);
    }

    #[test]
    fn test_unsupported_never_touch_transport() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let transport = MemoryTransport::new(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(json!({"status": "OK"}).to_string())
        });
        let editor = Editor::new(BridgeClient::new(transport));

        let unsupported = [
            editor.breakpoints().map(drop),
            editor.watchpoints().map(drop),
            editor.add_watchpoint("x", ""),
            editor.remove_watchpoint("x"),
            editor.pause(),
            editor.resume(),
            editor.is_paused().map(drop),
            editor.call_stack().map(drop),
            editor.paused_location().map(drop),
            editor.debugged_pid().map(drop),
            editor.wait_exit().map(drop),
        ];
        for result in unsupported {
            assert!(matches!(result, Err(BridgeError::UnsupportedOperation(_))));
        }

        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(editor.client().transport().opens(), 0);
        assert!(editor.client().transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_read_opens_then_reads_active_text() {
        let mut editor = editor_with_replies([
            json!({"status": "OK"}),
            json!({"status": "OK", "result": "fn main() {}\n"}),
        ]);

        let text = editor.read("src/main.rs").await.unwrap();
        assert_eq!(text, "fn main() {}\n");
        assert_eq!(
            sent(&editor),
            [
                Request::new("openTextDocument", vec![json!("src/main.rs")]),
                Request::new("eval", vec![json!(ACTIVE_TEXT)]),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_without_text() {
        let mut editor = editor_with_replies([json!({"status": "OK"}), json!({"status": "OK"})]);
        let err = assert_err!(editor.read("gone.rs").await);
        assert!(matches!(err, BridgeError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_write_escapes_text() {
        let mut editor = ok_editor();
        editor
            .write("notes.txt", "line \"one\"\nback\\slash")
            .await
            .unwrap();

        let sent = sent(&editor);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Request::new("openTextDocument", vec![json!("notes.txt")]));
        assert_eq!(sent[1].command, "eval");
        let expression = sent[1].args[0].as_str().unwrap();
        assert_eq!(
            expression,
            "(editor => editor.edit(edit => edit.replace(\
             new vscode.Range(0, 0, editor.document.lineCount, 0), \
             \"line \\\"one\\\"\\nback\\\\slash\")))\
             (vscode.window.activeTextEditor);"
        );
    }

    #[tokio::test]
    async fn test_attach_starts_first_attach_configuration() {
        let mut editor = editor_with_replies([
            json!({"status": "OK", "result": [
                {"name": "Launch tests", "type": "lldb"},
                {"name": "Remote Attach", "type": "lldb"},
                {"name": "attach local", "type": "lldb"},
            ]}),
            json!({"status": "OK", "result": true}),
        ]);

        let started = editor.attach().await.unwrap();
        assert_eq!(started.as_deref(), Some("Remote Attach"));

        let sent = sent(&editor);
        assert_eq!(sent[0], Request::new("eval", vec![json!(LAUNCH_CONFIGURATIONS)]));
        assert_eq!(sent[1].command, "debug.startDebugging");
        assert_eq!(sent[1].kwargs["nameOrConfiguration"], "Remote Attach");
    }

    #[tokio::test]
    async fn test_attach_without_configuration() {
        let mut editor =
            editor_with_replies([json!({"status": "OK", "result": [{"name": "Launch"}]})]);
        assert!(editor.attach().await.unwrap().is_none());
        assert_eq!(sent(&editor).len(), 1);

        let mut editor = editor_with_replies([json!({"status": "OK", "result": null})]);
        assert!(editor.attach().await.unwrap().is_none());

        let mut editor = editor_with_replies([json!({"status": "OK", "result": "launch"})]);
        let err = assert_err!(editor.attach().await);
        assert!(matches!(err, BridgeError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_detach() {
        let mut idle = editor_with_replies([json!({"status": "OK", "result": null})]);
        assert!(!idle.detach().await.unwrap());
        let commands: Vec<_> = sent(&idle).into_iter().map(|r| r.command).collect();
        assert_eq!(commands, ["debug.activeDebugSession"]);

        let mut busy = editor_with_replies([
            json!({"status": "OK", "result": {"id": "s1", "name": "Remote Attach"}}),
            json!({"status": "OK"}),
        ]);
        assert!(busy.detach().await.unwrap());
        let commands: Vec<_> = sent(&busy).into_iter().map(|r| r.command).collect();
        assert_eq!(commands, ["debug.activeDebugSession", "debug.stopDebugging"]);
    }
}

use std::collections::VecDeque;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use crate::backend::BackendClient;
use crate::session::{ChatMessage, InputError, SelectedFile};
use crate::tui::{AppEvent, BackendEvent};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF uploaded successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    GetStarted,
    FileInput,
    UploadButton,
    Question,
}

/// Single-line text field with a cursor counted in chars
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextInput {
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Empty the field and hand back what was in it
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Focus,

    // Upload form
    pub file_input: TextInput,
    pub selected_file: Option<SelectedFile>,

    // Document chat
    pub extracted_text: Option<String>,
    pub question_input: TextInput,
    pub transcript: Vec<ChatMessage>,
    in_flight: usize,

    // Pending alerts, front is the one on screen
    pub alerts: VecDeque<String>,

    // Transcript viewport, updated during render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,

    pub animation_frame: u8,

    backend: BackendClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(backend: BackendClient, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: Focus::GetStarted,

            file_input: TextInput::default(),
            selected_file: None,

            extracted_text: None,
            question_input: TextInput::default(),
            transcript: Vec::new(),
            in_flight: 0,

            alerts: VecDeque::new(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            backend,
            events,
        }
    }

    pub fn backend_url(&self) -> &str {
        self.backend.base_url()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// The chat panel exists only once a document has been extracted
    pub fn chat_visible(&self) -> bool {
        self.extracted_text.is_some()
    }

    // Alerts

    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alerts.push_back(message.into());
    }

    pub fn current_alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    pub fn dismiss_alert(&mut self) {
        self.alerts.pop_front();
    }

    // Focus

    /// "Get started": jump to the file input and start typing a path
    pub fn get_started(&mut self) {
        self.focus = Focus::FileInput;
        self.input_mode = InputMode::Editing;
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            Focus::GetStarted => Focus::FileInput,
            Focus::FileInput => Focus::UploadButton,
            Focus::UploadButton if self.chat_visible() => Focus::Question,
            Focus::UploadButton | Focus::Question => Focus::GetStarted,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            Focus::GetStarted if self.chat_visible() => Focus::Question,
            Focus::GetStarted => Focus::UploadButton,
            Focus::FileInput => Focus::GetStarted,
            Focus::UploadButton => Focus::FileInput,
            Focus::Question => Focus::UploadButton,
        };
    }

    // Upload flow

    /// Commit the typed path as the selected file. An empty path clears the selection.
    pub fn confirm_file_selection(&mut self) {
        if self.file_input.value.trim().is_empty() {
            self.selected_file = None;
            return;
        }

        match SelectedFile::from_input(&self.file_input.value) {
            Ok(file) => {
                log::info!("Selected {} ({})", file.path.display(), file.display_size());
                self.selected_file = Some(file);
            }
            Err(e) => {
                self.selected_file = None;
                self.show_alert(e.to_string());
            }
        }
    }

    /// Fill the path field and commit it, as if the user had typed it
    pub fn preselect_file(&mut self, input: &str) {
        self.file_input.set(input);
        self.confirm_file_selection();
    }

    pub fn submit_upload(&mut self) {
        let Some(file) = self.selected_file.clone() else {
            self.show_alert(InputError::NoFileSelected.to_string());
            return;
        };

        self.in_flight += 1;
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.upload(&file.path).await;
            let _ = events.send(AppEvent::Backend(BackendEvent::Uploaded(result)));
        });
    }

    // Ask flow

    pub fn submit_question(&mut self) {
        if self.question_input.value.is_empty() {
            self.show_alert(InputError::EmptyQuestion.to_string());
            return;
        }
        let Some(pdf_text) = self.extracted_text.clone() else {
            self.show_alert(InputError::NoDocument.to_string());
            return;
        };

        let question = self.question_input.take();
        self.transcript.push(ChatMessage::user(question.clone()));
        self.scroll_chat_to_bottom();

        self.in_flight += 1;
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.ask(&question, &pdf_text).await;
            let _ = events.send(AppEvent::Backend(BackendEvent::Answered(result)));
        });
    }

    /// Apply a finished request. Answers land in completion order.
    pub fn apply_backend_event(&mut self, event: BackendEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match event {
            BackendEvent::Uploaded(Ok(text)) => {
                self.extracted_text = Some(text);
                self.show_alert(UPLOAD_SUCCESS_MESSAGE);
            }
            BackendEvent::Uploaded(Err(e)) => {
                log::error!("Error uploading PDF: {:#}", e);
            }
            BackendEvent::Answered(Ok(answer)) => {
                self.transcript.push(ChatMessage::bot(answer));
                self.scroll_chat_to_bottom();
            }
            BackendEvent::Answered(Err(e)) => {
                log::error!("Error asking question: {:#}", e);
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll so the newest message and the loading line are visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in &self.transcript {
            for line in msg.text.lines() {
                total_lines += line.chars().count() / wrap_width + 1;
            }
            total_lines += 1; // gap between messages
        }
        total_lines += 1; // "Loading..."

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        self.chat_scroll = u16::try_from(total_lines.saturating_sub(visible_height)).unwrap_or(u16::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Sender;
    use serde_json::json;
    use std::io::Write;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn app_for(server: &MockServer) -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = BackendClient::new(&server.uri(), None).unwrap();
        (App::new(backend, tx), rx)
    }

    async fn next_backend_event(rx: &mut UnboundedReceiver<AppEvent>) -> BackendEvent {
        match rx.recv().await {
            Some(AppEvent::Backend(event)) => event,
            other => panic!("expected backend event, got {:?}", other),
        }
    }

    fn pdf_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();
        file
    }

    async fn mount_upload(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
            .mount(server)
            .await;
    }

    /// Upload a file against `server` and apply the result
    async fn uploaded_app(server: &MockServer) -> (App, UnboundedReceiver<AppEvent>) {
        mount_upload(server, "hello").await;
        let (mut app, mut rx) = app_for(server);
        let file = pdf_file();
        app.preselect_file(file.path().to_str().unwrap());
        app.submit_upload();
        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);
        app.dismiss_alert();
        (app, rx)
    }

    #[tokio::test]
    async fn upload_without_file_alerts_and_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (mut app, mut rx) = app_for(&server);
        app.submit_upload();

        assert_eq!(app.current_alert(), Some("Please select a PDF file"));
        assert!(!app.is_loading());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn successful_upload_reveals_chat() {
        let server = MockServer::start().await;
        mount_upload(&server, "hello").await;
        let (mut app, mut rx) = app_for(&server);
        let file = pdf_file();
        app.preselect_file(file.path().to_str().unwrap());

        assert!(!app.chat_visible());
        app.submit_upload();
        assert!(app.is_loading());

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);

        assert!(!app.is_loading());
        assert!(app.chat_visible());
        assert_eq!(app.extracted_text.as_deref(), Some("hello"));
        assert_eq!(app.current_alert(), Some(UPLOAD_SUCCESS_MESSAGE));
    }

    #[tokio::test]
    async fn failed_upload_leaves_state_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (mut app, mut rx) = app_for(&server);
        let file = pdf_file();
        app.preselect_file(file.path().to_str().unwrap());
        app.submit_upload();

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);

        assert!(!app.is_loading());
        assert!(app.extracted_text.is_none());
        assert!(app.current_alert().is_none());
    }

    #[tokio::test]
    async fn question_without_document_alerts_and_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (mut app, mut rx) = app_for(&server);
        app.question_input.set("What is this?");
        app.submit_question();

        assert_eq!(app.current_alert(), Some("Upload a PDF first"));
        assert!(app.transcript.is_empty());
        assert_eq!(app.question_input.value, "What is this?");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_question_is_checked_before_document() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);

        app.question_input.set("");
        app.submit_question();

        assert_eq!(app.current_alert(), Some("Please enter a question"));
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn question_is_sent_and_recorded_as_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_json(json!({ "question": "  Why?  ", "pdfText": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "Because." })))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, mut rx) = uploaded_app(&server).await;

        app.question_input.set("  Why?  ");
        app.submit_question();
        assert_eq!(app.transcript, vec![ChatMessage::user("  Why?  ")]);

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);
        assert_eq!(app.transcript[1], ChatMessage::bot("Because."));
    }

    #[tokio::test]
    async fn whitespace_only_question_is_not_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_json(json!({ "question": "   ", "pdfText": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "?" })))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, mut rx) = uploaded_app(&server).await;

        app.question_input.set("   ");
        app.submit_question();
        assert!(app.current_alert().is_none());
        assert!(app.is_loading());

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);
        assert_eq!(app.transcript.len(), 2);
    }

    #[tokio::test]
    async fn huge_answer_clamps_scroll_offset() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);
        app.chat_height = 10;
        app.chat_width = 40;

        app.apply_backend_event(BackendEvent::Answered(Ok("line\n".repeat(70_000))));

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.chat_scroll, u16::MAX);
    }

    #[tokio::test]
    async fn appending_past_viewport_scrolls_to_bottom() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);
        app.chat_height = 5;
        app.chat_width = 40;

        app.apply_backend_event(BackendEvent::Answered(Ok("one".to_string())));
        assert_eq!(app.chat_scroll, 0);

        // 2 + 4 + 4 message lines, one loading line, five visible
        app.apply_backend_event(BackendEvent::Answered(Ok("a\nb\nc".to_string())));
        app.apply_backend_event(BackendEvent::Answered(Ok("d\ne\nf".to_string())));
        assert_eq!(app.chat_scroll, 11 - 5);
    }

    #[tokio::test]
    async fn ask_appends_user_then_bot_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_json(json!({ "question": "What is this?", "pdfText": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "A doc." })))
            .expect(1)
            .mount(&server)
            .await;
        let (mut app, mut rx) = uploaded_app(&server).await;

        app.question_input.set("What is this?");
        app.submit_question();

        assert_eq!(app.transcript, vec![ChatMessage::user("What is this?")]);
        assert!(app.question_input.value.is_empty());
        assert!(app.is_loading());

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);

        assert_eq!(
            app.transcript,
            vec![ChatMessage::user("What is this?"), ChatMessage::bot("A doc.")]
        );
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn failed_ask_keeps_question_without_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let (mut app, mut rx) = uploaded_app(&server).await;

        app.question_input.set("Anything?");
        app.submit_question();
        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].sender, Sender::User);
        assert!(app.current_alert().is_none());
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn overlapping_asks_keep_loading_until_last_completes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "ok" })))
            .expect(2)
            .mount(&server)
            .await;
        let (mut app, mut rx) = uploaded_app(&server).await;

        app.question_input.set("first");
        app.submit_question();
        app.question_input.set("second");
        app.submit_question();

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);
        assert!(app.is_loading());

        let event = next_backend_event(&mut rx).await;
        app.apply_backend_event(event);
        assert!(!app.is_loading());

        let bots = app.transcript.iter().filter(|m| m.sender == Sender::Bot).count();
        assert_eq!(bots, 2);
    }

    #[tokio::test]
    async fn confirming_missing_path_alerts_and_clears_selection() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);
        let file = pdf_file();
        app.preselect_file(file.path().to_str().unwrap());

        app.file_input.set("/definitely/not/here.pdf");
        app.confirm_file_selection();

        assert!(app.selected_file.is_none());
        assert!(app.current_alert().unwrap().starts_with("File not found"));
    }

    #[tokio::test]
    async fn preselecting_behaves_like_typed_path() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);
        let file = pdf_file();

        app.preselect_file(file.path().to_str().unwrap());
        assert_eq!(app.selected_file.as_ref().unwrap().path, file.path());
        assert!(app.current_alert().is_none());

        app.preselect_file("/definitely/not/here.pdf");
        assert!(app.selected_file.is_none());
        assert_eq!(app.file_input.value, "/definitely/not/here.pdf");
        assert!(app.current_alert().unwrap().starts_with("File not found"));
    }

    #[tokio::test]
    async fn alerts_queue_in_order() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);

        app.submit_upload();
        app.submit_question();
        assert_eq!(app.current_alert(), Some("Please select a PDF file"));
        app.dismiss_alert();
        assert_eq!(app.current_alert(), Some("Please enter a question"));
        app.dismiss_alert();
        assert!(app.current_alert().is_none());
    }

    #[tokio::test]
    async fn focus_skips_question_until_chat_is_visible() {
        let server = MockServer::start().await;
        let (mut app, _rx) = app_for(&server);

        app.focus = Focus::UploadButton;
        app.focus_next();
        assert_eq!(app.focus, Focus::GetStarted);

        app.extracted_text = Some("text".to_string());
        app.focus = Focus::UploadButton;
        app.focus_next();
        assert_eq!(app.focus, Focus::Question);
        app.focus_prev();
        assert_eq!(app.focus, Focus::UploadButton);
    }

    #[test]
    fn text_input_edits_by_char() {
        let mut input = TextInput::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.value, "hélo");
        input.home();
        input.delete();
        assert_eq!(input.value, "élo");
        input.end();
        input.insert('!');
        assert_eq!(input.take(), "élo!");
        assert_eq!(input.cursor, 0);
    }
}

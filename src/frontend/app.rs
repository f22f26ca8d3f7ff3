use std::sync::Arc;

use dioxus::html::input_data::keyboard_types::{Key, Modifiers};
use dioxus::prelude::*;
use tracing::{error, warn};

use super::components::*;
use crate::chat_core::{LocalBot, Message, Pending, Recognizer, Request, Sender, Speaker};
use crate::config::Config;

const NO_RECOGNITION: &str = "Speech recognition is not supported here.";
const NO_SYNTHESIS: &str = "Speech synthesis is not available.";

pub struct AppProps {
    pub config: Arc<Config>,
}

/// The persisted transcript, or why it couldn't be read.
type History = Result<Vec<Message>, String>;

/// Hook handles one request/reply exchange needs, detached from the render scope.
#[derive(Clone)]
struct Session {
    bot: UseRef<LocalBot>,
    bubbles: UseRef<Vec<Message>>,
    history: UseRef<History>,
    busy: UseState<bool>,
}

impl Session {
    fn new(
        bot: &UseRef<LocalBot>,
        bubbles: &UseRef<Vec<Message>>,
        history: &UseRef<History>,
        busy: &UseState<bool>,
    ) -> Session {
        Session {
            bot: bot.clone(),
            bubbles: bubbles.clone(),
            history: history.clone(),
            busy: busy.clone(),
        }
    }

    /// Records `request` unless the bot is still waiting on an earlier reply.
    fn begin(&self, request: Request) -> Option<Pending> {
        let asked = self.bot.write().ask(request);
        match asked {
            Ok(None) => None,
            Ok(Some((pending, history))) => {
                self.bubbles.write().extend(history.last().cloned());
                self.history.set(Ok(history));
                self.busy.set(true);
                Some(pending)
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    async fn finish(self, pending: Pending) {
        let reply = pending.resolve().await;
        self.bubbles
            .write()
            .push(Message::new(Sender::Bot, reply.as_str()));
        let recorded = self.bot.write().record_reply(&reply);
        match recorded {
            Ok(history) => self.history.set(Ok(history)),
            Err(err) => self.fail(err),
        }
        self.busy.set(false);
    }

    fn fail(&self, err: anyhow::Error) {
        error!("Chat history unavailable: {:#}", err);
        self.history.set(Err(format!("{:#}", err)));
    }
}

pub fn app(cx: Scope<AppProps>) -> Element {
    let bot = use_ref(cx, || LocalBot::from_config(&cx.props.config));
    let history = use_ref(cx, || {
        bot.read().history().map_err(|err| {
            error!("Failed to load chat history: {:#}", err);
            format!("{:#}", err)
        })
    });
    let bubbles = use_ref(cx, Vec::<Message>::new);
    let busy = use_state(cx, || false);
    let draft = use_state(cx, String::new);
    let attachment = use_state(cx, String::new);
    let show_library = use_state(cx, || false);
    let speaker = use_ref(cx, || Speaker::from_config(&cx.props.config));
    let speaking = use_state(cx, || None::<usize>);
    let recognizer = use_state(cx, || Recognizer::from_config(&cx.props.config));
    let listening = use_state(cx, || false);
    let notice = use_state(cx, || {
        recognizer.get().is_none().then(|| NO_RECOGNITION.to_string())
    });

    let fatal = history.read().as_ref().err().cloned();
    if let Some(reason) = fatal {
        return cx.render(rsx!(
            style { include_str!("./style.css") }
            div {
                id: "fatal",
                h2 { "Chat history could not be loaded" }
                p { "{reason}" }
            }
        ));
    }

    let submit = move |request: Request| {
        let session = Session::new(bot, bubbles, history, busy);
        if let Some(pending) = session.begin(request) {
            cx.spawn(session.finish(pending));
        }
    };

    let send_draft = move || {
        if bot.read().is_waiting() {
            return;
        }
        if let Some(request) = Request::text(draft.get()) {
            draft.set(String::new());
            submit(request);
        }
    };

    let send_attachment = move |kind: fn(&str) -> Option<Request>| {
        if bot.read().is_waiting() {
            return;
        }
        if let Some(request) = kind(attachment.get()) {
            attachment.set(String::new());
            submit(request);
        }
    };

    let send_enter = move |e: KeyboardEvent| {
        if e.data.key() == Key::Enter && !e.data.modifiers().contains(Modifiers::SHIFT) {
            send_draft();
        }
    };

    let listen = move |_: MouseEvent| {
        let Some(recognizer) = recognizer.get().clone() else {
            notice.set(Some(NO_RECOGNITION.to_string()));
            return;
        };
        if *listening.get() || bot.read().is_waiting() {
            return;
        }
        listening.set(true);

        let session = Session::new(bot, bubbles, history, busy);
        cx.spawn({
            to_owned![listening, draft];
            async move {
                let heard = recognizer.listen().await;
                listening.set(false);
                match heard {
                    Ok(transcript) => {
                        draft.set(transcript.clone());
                        let pending =
                            Request::text(&transcript).and_then(|request| session.begin(request));
                        if let Some(pending) = pending {
                            session.finish(pending).await;
                        }
                    }
                    Err(err) => warn!("Speech recognition failed: {:#}", err),
                }
            }
        });
    };

    let hear = move |index: usize| {
        let Some(text) = bubbles.read().get(index).map(|msg| msg.text.clone()) else {
            return;
        };
        let toggled = speaker.with_mut(|speaker| speaker.as_mut().map(|s| s.toggle(&text)));
        match toggled {
            Some(Ok(Some(utterance))) => {
                speaking.set(Some(index));
                cx.spawn({
                    to_owned![speaker, speaking];
                    async move {
                        utterance.finished().await;
                        let still = speaker.read().as_ref().map_or(false, Speaker::is_speaking);
                        if !still {
                            speaking.set(None);
                        }
                    }
                });
            }
            Some(Ok(None)) => speaking.set(None),
            Some(Err(err)) => {
                warn!("Speech synthesis failed: {:#}", err);
                notice.set(Some(NO_SYNTHESIS.to_string()));
            }
            None => notice.set(Some(NO_SYNTHESIS.to_string())),
        }
    };

    let entries = history.read().clone().unwrap_or_default();
    let notice_text = notice.get().clone();
    let voice_label = if *listening.get() { "🎙️" } else { "🎤" };
    let voice_class = if *listening.get() { "listening" } else { "" };
    let no_voice = recognizer.get().is_none();

    cx.render(rsx!(
        style { include_str!("./style.css") }
        div {
            id: "header",
            h1 {"🌱 Kalpataru"}
            h2 {"Your farming assistant"}
            button {
                id: "library-btn",
                onclick: move |_| show_library.set(!show_library.get()),
                "📚 Library"
            }
        }
        notice_text.map(|text| rsx!(Notice {
            text: text,
            on_close: move |_| notice.set(None),
        }))
        if *show_library.get() {
            rsx!(div {
                id: "library",
                HistoryList { entries: entries }
            })
        }
        div {
            id: "chat-box",
            class: "chat-window",
            for (index, msg) in bubbles.read().iter().enumerate() {
                match msg.sender {
                    Sender::User => rsx!(UserMessage { content: msg.text.clone() }),
                    Sender::Bot => rsx!(BotMessage {
                        content: msg.text.clone(),
                        speaking: *speaking.get() == Some(index),
                        on_hear: move |_| hear(index),
                    }),
                }
            }
            if *busy.get() {
                rsx!(Loading {})
            }
        }
        div {
            id: "input-area",
            input {
                id: "user-input",
                placeholder: "Ask about crops, weather or pests",
                value: "{draft}",
                oninput: move |evt| draft.set(evt.value.clone()),
                onkeydown: send_enter,
            }
            button {
                id: "send-btn",
                onclick: move |_| send_draft(),
                "Send"
            }
            button {
                id: "voice-btn",
                class: "{voice_class}",
                disabled: "{no_voice}",
                onclick: listen,
                "{voice_label}"
            }
        }
        div {
            id: "attach-area",
            input {
                id: "attachment-path",
                placeholder: "Path to an image or file",
                value: "{attachment}",
                oninput: move |evt| attachment.set(evt.value.clone()),
            }
            button {
                onclick: move |_| send_attachment(Request::image),
                "📷 Diagnose"
            }
            button {
                onclick: move |_| send_attachment(Request::file),
                "📂 Upload"
            }
        }
        div {
            id: "bottom-holder"
        }
    ))
}

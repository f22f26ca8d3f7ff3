#![allow(non_snake_case)]

use dioxus::prelude::*;

use crate::chat_core::{Message, Sender};

#[derive(PartialEq, Props)]
pub struct ContentProps {
    content: String,
}

pub fn UserMessage(cx: Scope<ContentProps>) -> Element {
    let author = Sender::User.author();
    cx.render(rsx!(
        div {
            class: "chat-message user-message",
            b { "{author}: " }
            "{cx.props.content}"
        }
    ))
}

#[derive(Props)]
pub struct BotMessageProps<'a> {
    content: String,
    speaking: bool,
    on_hear: EventHandler<'a, MouseEvent>,
}

/// A reply bubble with its read-aloud toggle.
pub fn BotMessage<'a>(cx: Scope<'a, BotMessageProps<'a>>) -> Element<'a> {
    let author = Sender::Bot.author();
    let label = if cx.props.speaking { "⏹ Stop" } else { "🔊 Hear" };
    cx.render(rsx!(
        div {
            class: "chat-message bot-message",
            b { "{author}: " }
            "{cx.props.content}"
            button {
                class: "listen-btn",
                onclick: move |evt| cx.props.on_hear.call(evt),
                "{label}"
            }
        }
    ))
}

pub fn Loading(cx: Scope) -> Element {
    cx.render(rsx!(
        div {
            class: "chat-message bot-message",
            div {
                class: "spinner",
            }
        }
    ))
}

#[derive(PartialEq, Props)]
pub struct HistoryProps {
    entries: Vec<Message>,
}

pub fn HistoryList(cx: Scope<HistoryProps>) -> Element {
    cx.render(rsx!(
        ul {
            id: "history",
            cx.props.entries.iter().map(|entry| {
                let line = entry.history_line();
                rsx!(li { "{line}" })
            })
        }
    ))
}

#[derive(Props)]
pub struct NoticeProps<'a> {
    text: String,
    on_close: EventHandler<'a, MouseEvent>,
}

pub fn Notice<'a>(cx: Scope<'a, NoticeProps<'a>>) -> Element<'a> {
    cx.render(rsx!(
        div {
            class: "notice",
            span { "{cx.props.text}" }
            button {
                onclick: move |evt| cx.props.on_close.call(evt),
                "OK"
            }
        }
    ))
}

//! Conversational state machine.
//!
//! `transition` maps (state, inbound text) to the next state and one action.
//! Actions that need the store are executed by the session, and their outcome
//! is folded back through the `on_*` functions, which are pure as well.

use crate::{
    catalog::{filter_label, find_filter_by_label, PartitionCatalog},
    domain::{Category, ExperienceFilter, SubscriptionRecord},
    Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingCategoryChoice,
    AwaitingFilterChoice {
        category: Category,
    },
    AwaitingUnsubscribeTarget,
}

/// Commands recognised from any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Follow,
    Unfollow,
    MyFollows,
}

impl Command {
    /// Parse `/cmd` or `/cmd@botname`. Arguments are not accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let name = text.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "follow" => Some(Self::Follow),
            "unfollow" => Some(Self::Unfollow),
            "myfollows" => Some(Self::MyFollows),
            _ => None,
        }
    }
}

/// Side effect requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Reply(Reply),
    /// Load the subscriber's record and offer its categories for removal.
    PrepareUnsubscribe,
    /// Load the subscriber's record and list its entries.
    ListSubscriptions,
    Subscribe {
        category: Category,
        filter: ExperienceFilter,
    },
    Unsubscribe {
        category_name: String,
    },
}

/// Everything the bot can say in a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Help,
    CategoryMenu(Vec<String>),
    FilterMenu { category: String },
    CategoryNotFound,
    FilterNotFound,
    Subscribed { category: String, filter: String },
    AlreadySubscribed { category: String, filter: String },
    SubscribeFailed,
    NoSubscriptions,
    LoadFailed,
    UnsubscribeMenu(Vec<String>),
    Subscriptions(Vec<(String, String)>),
    Unsubscribed { category: String },
    NotSubscribedTo { category: String },
    UnsubscribeFailed,
    Flood,
}

pub fn transition(
    state: &ConversationState,
    text: &str,
    catalog: &PartitionCatalog,
) -> (ConversationState, Action) {
    use ConversationState as S;

    if let Some(cmd) = Command::parse(text) {
        return match cmd {
            Command::Start | Command::Help => (S::Idle, Action::Reply(Reply::Help)),
            Command::Follow => (
                S::AwaitingCategoryChoice,
                Action::Reply(Reply::CategoryMenu(
                    catalog.categories().iter().map(|c| c.name.clone()).collect(),
                )),
            ),
            Command::Unfollow => (S::AwaitingUnsubscribeTarget, Action::PrepareUnsubscribe),
            Command::MyFollows => (S::Idle, Action::ListSubscriptions),
        };
    }

    let text = text.trim();
    match state {
        S::Idle => (S::Idle, Action::Reply(Reply::Help)),
        S::AwaitingCategoryChoice => match catalog.find_category(text) {
            Some(category) => (
                S::AwaitingFilterChoice {
                    category: category.clone(),
                },
                Action::Reply(Reply::FilterMenu {
                    category: category.name.clone(),
                }),
            ),
            None => (S::Idle, Action::Reply(Reply::CategoryNotFound)),
        },
        S::AwaitingFilterChoice { category } => match find_filter_by_label(text) {
            Some(filter) => (
                S::Idle,
                Action::Subscribe {
                    category: category.clone(),
                    filter,
                },
            ),
            None => (S::Idle, Action::Reply(Reply::FilterNotFound)),
        },
        S::AwaitingUnsubscribeTarget => (
            S::Idle,
            Action::Unsubscribe {
                category_name: text.to_string(),
            },
        ),
    }
}

pub fn on_subscribe(
    category: &Category,
    filter: &ExperienceFilter,
    outcome: &Result<bool>,
) -> (ConversationState, Reply) {
    let reply = match outcome {
        Ok(true) => Reply::Subscribed {
            category: category.name.clone(),
            filter: filter.label.to_string(),
        },
        Ok(false) => Reply::AlreadySubscribed {
            category: category.name.clone(),
            filter: filter.label.to_string(),
        },
        Err(_) => Reply::SubscribeFailed,
    };
    (ConversationState::Idle, reply)
}

/// A missing record is reported like an empty one; other errors ask to retry.
fn loaded_entries(outcome: &Result<SubscriptionRecord>) -> std::result::Result<&SubscriptionRecord, Reply> {
    match outcome {
        Ok(rec) if !rec.subscriptions.is_empty() => Ok(rec),
        Ok(_) => Err(Reply::NoSubscriptions),
        Err(e) if e.is_not_found() => Err(Reply::NoSubscriptions),
        Err(_) => Err(Reply::LoadFailed),
    }
}

pub fn on_unsubscribe_prepared(outcome: &Result<SubscriptionRecord>) -> (ConversationState, Reply) {
    match loaded_entries(outcome) {
        Ok(rec) => {
            let mut names: Vec<String> = Vec::new();
            for entry in &rec.subscriptions {
                if !names.contains(&entry.category_name) {
                    names.push(entry.category_name.clone());
                }
            }
            (
                ConversationState::AwaitingUnsubscribeTarget,
                Reply::UnsubscribeMenu(names),
            )
        }
        Err(reply) => (ConversationState::Idle, reply),
    }
}

pub fn on_subscriptions_listed(outcome: &Result<SubscriptionRecord>) -> (ConversationState, Reply) {
    let reply = match loaded_entries(outcome) {
        Ok(rec) => Reply::Subscriptions(
            rec.subscriptions
                .iter()
                .map(|s| (s.category_name.clone(), filter_label(&s.filter_id)))
                .collect(),
        ),
        Err(reply) => reply,
    };
    (ConversationState::Idle, reply)
}

pub fn on_unsubscribe(category_name: &str, outcome: &Result<bool>) -> (ConversationState, Reply) {
    let reply = match outcome {
        Ok(true) => Reply::Unsubscribed {
            category: category_name.to_string(),
        },
        Ok(false) => Reply::NotSubscribedTo {
            category: category_name.to_string(),
        },
        Err(_) => Reply::UnsubscribeFailed,
    };
    (ConversationState::Idle, reply)
}

use archive_core::helpers::dto::{CourseSummary, VideoSessionSummary};
use archive_core::pagination::{PAGE_ROWS, Page};
use archive_core::upload::input::{NO_TOPIC_SENTINEL, TODAY_SHORTCUT};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::callbacks::CallbackAction;

pub const COURSE_COLUMNS: usize = 2;
pub const VIDEO_COLUMNS: usize = 4;

/// An item that can be listed on a paginated inline keyboard.
pub trait PaginatedButton {
    fn text(&self) -> String;
    fn action(&self) -> CallbackAction;
    /// Action for the `Next →` button when this is the last item on the page.
    fn next_page(&self) -> CallbackAction;
    /// Action for the `← Back` button when this is the first item on the page.
    fn previous_page(&self) -> CallbackAction;
}

impl PaginatedButton for CourseSummary {
    fn text(&self) -> String {
        format!("{} G{}", self.name, self.group_id)
    }

    fn action(&self) -> CallbackAction {
        CallbackAction::Course(self.id)
    }

    fn next_page(&self) -> CallbackAction {
        CallbackAction::CoursesNext(self.id)
    }

    fn previous_page(&self) -> CallbackAction {
        CallbackAction::CoursesPrev(self.id)
    }
}

impl PaginatedButton for VideoSessionSummary {
    fn text(&self) -> String {
        format!("Session {}", self.session_number)
    }

    fn action(&self) -> CallbackAction {
        CallbackAction::Video(self.id)
    }

    fn next_page(&self) -> CallbackAction {
        CallbackAction::VideosNext {
            course_id: self.course_id,
            session_number: self.session_number,
        }
    }

    fn previous_page(&self) -> CallbackAction {
        CallbackAction::VideosPrev {
            course_id: self.course_id,
            session_number: self.session_number,
        }
    }
}

fn callback_button(text: impl Into<String>, action: &CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.data())
}

pub fn paginate_buttons<T: PaginatedButton>(page: &Page<T>, columns: usize) -> InlineKeyboardMarkup {
    let columns = columns.max(1);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = page
        .items
        .iter()
        .take(columns * PAGE_ROWS)
        .collect::<Vec<_>>()
        .chunks(columns)
        .map(|chunk| {
            chunk
                .iter()
                .map(|item| callback_button(item.text(), &item.action()))
                .collect()
        })
        .collect();

    let mut navigation = Vec::new();
    if page.has_before {
        if let Some(first) = page.items.first() {
            navigation.push(callback_button("← Back", &first.previous_page()));
        }
    }
    if page.has_next {
        if let Some(last) = page.items.last() {
            navigation.push(callback_button("Next →", &last.next_page()));
        }
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn course_buttons(course_id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        callback_button("Get Videos", &CallbackAction::Videos(course_id)),
        callback_button("Upload Video", &CallbackAction::Upload(course_id)),
    ]])
}

pub fn review_buttons(video_id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        callback_button(
            "Accept ✅",
            &CallbackAction::Review {
                video_id,
                accepted: true,
            },
        ),
        callback_button(
            "Reject ❌",
            &CallbackAction::Review {
                video_id,
                accepted: false,
            },
        ),
    ]])
}

fn single_choice_keyboard(choice: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(choice)]])
        .one_time_keyboard()
        .resize_keyboard()
}

pub fn today_keyboard() -> KeyboardMarkup {
    single_choice_keyboard(TODAY_SHORTCUT)
}

pub fn no_topic_keyboard() -> KeyboardMarkup {
    single_choice_keyboard(NO_TOPIC_SENTINEL)
}

//! Row to response conversions. Rows are never serialized directly.

use chrono::NaiveDate;

use kindred_db::PagedList;
use kindred_db::filters::age_on;
use kindred_db::models::{MessageView, PhotoRow, UserWithPhotos};
use kindred_types::api::{
    MessageForReturn, PaginationHeader, PhotoForDetail, PhotoForReturn, UserForDetail, UserForList,
};

pub fn user_for_list(user: UserWithPhotos, today: NaiveDate) -> UserForList {
    let photo_url = user.main_photo_url().map(str::to_string);
    let u = user.user;

    UserForList {
        id: u.id,
        username: u.username,
        gender: u.gender,
        age: u.date_of_birth.map(|dob| age_on(dob, today)),
        known_as: u.known_as,
        created: u.created,
        last_active: u.last_active,
        city: u.city,
        country: u.country,
        photo_url,
    }
}

pub fn user_for_detail(user: UserWithPhotos, today: NaiveDate) -> UserForDetail {
    let photo_url = user.main_photo_url().map(str::to_string);
    let photos = user.photos.iter().map(photo_for_detail).collect();
    let u = user.user;

    UserForDetail {
        id: u.id,
        username: u.username,
        gender: u.gender,
        age: u.date_of_birth.map(|dob| age_on(dob, today)),
        known_as: u.known_as,
        created: u.created,
        last_active: u.last_active,
        introduction: u.introduction,
        looking_for: u.looking_for,
        interests: u.interests,
        city: u.city,
        country: u.country,
        photo_url,
        photos,
    }
}

pub fn photo_for_detail(photo: &PhotoRow) -> PhotoForDetail {
    PhotoForDetail {
        id: photo.id,
        url: photo.url.clone(),
        description: photo.description.clone(),
        date_added: photo.date_added,
        is_main: photo.is_main,
    }
}

pub fn photo_for_return(photo: PhotoRow) -> PhotoForReturn {
    PhotoForReturn {
        id: photo.id,
        url: photo.url,
        description: photo.description,
        date_added: photo.date_added,
        is_main: photo.is_main,
        public_id: photo.public_id,
    }
}

pub fn message_for_return(view: MessageView) -> MessageForReturn {
    let m = view.message;

    MessageForReturn {
        id: m.id,
        sender_id: m.sender_id,
        sender_known_as: view.sender_known_as,
        sender_photo_url: view.sender_photo_url,
        recipient_id: m.recipient_id,
        recipient_known_as: view.recipient_known_as,
        recipient_photo_url: view.recipient_photo_url,
        content: m.content,
        is_read: m.is_read,
        message_read_time: m.message_read_time,
        message_sent_time: m.message_sent_time,
    }
}

pub fn pagination_header<T>(page: &PagedList<T>) -> PaginationHeader {
    PaginationHeader {
        current_page: page.current_page,
        items_per_page: page.page_size,
        total_items: page.total_count,
        total_pages: page.total_pages,
    }
}

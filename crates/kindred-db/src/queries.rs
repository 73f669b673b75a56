use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::Database;
use crate::filters::{MessageContainer, MessageFilter, UserFilter, UserOrder};
use crate::models::{
    LikeRow, MESSAGE_COLUMNS, MessageRow, MessageView, PHOTO_COLUMNS, PhotoRow, USER_COLUMNS,
    UserRow, UserWithPhotos,
};
use crate::pagination::{PageQuery, PagedList, paginate};

/// Messages joined with both participants' display name and main photo.
const MESSAGE_VIEW_FROM: &str = "messages m
     JOIN users s ON s.id = m.sender_id
     JOIN users r ON r.id = m.recipient_id
     LEFT JOIN photos sp ON sp.user_id = s.id AND sp.is_main = 1
     LEFT JOIN photos rp ON rp.user_id = r.id AND rp.is_main = 1";

const MESSAGE_VIEW_EXTRA_COLUMNS: &str = "s.known_as, sp.url, r.known_as, rp.url";

impl Database {
    // -- Users --

    pub fn get_users(&self, filter: &UserFilter) -> Result<PagedList<UserWithPhotos>> {
        self.with_conn(|conn| {
            let order_by = match filter.order {
                UserOrder::Created => "u.created DESC, u.id DESC",
                UserOrder::LastActive => "u.last_active DESC, u.id DESC",
            };
            let mut query = PageQuery::new(USER_COLUMNS, "users u", order_by);

            query
                .filter("u.id != ?", [filter.user_id])
                .filter("u.gender = ?", [filter.gender.clone()]);

            if filter.likers {
                query.filter(
                    "u.id IN (SELECT liker_id FROM likes WHERE likee_id = ?)",
                    [filter.user_id],
                );
            }

            if filter.likees {
                query.filter(
                    "u.id IN (SELECT likee_id FROM likes WHERE liker_id = ?)",
                    [filter.user_id],
                );
            }

            let (earliest, latest) = filter.birth_date_window();
            query.filter(
                "u.date_of_birth >= ? AND u.date_of_birth <= ?",
                [earliest.format("%F").to_string(), latest.format("%F").to_string()],
            );

            let page = paginate(conn, &query, filter.page, |row| UserRow::from_row(row, 0))?;

            let ids: Vec<i64> = page.items.iter().map(|u| u.id).collect();
            let mut photos = photos_for_users(conn, &ids)?;

            Ok(page.map(|user| UserWithPhotos {
                photos: photos.remove(&user.id).unwrap_or_default(),
                user,
            }))
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserWithPhotos>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS);
            let Some(user) = conn
                .query_row(&sql, [id], |row| UserRow::from_row(row, 0))
                .optional()?
            else {
                return Ok(None);
            };

            let photos = photos_for_users(conn, &[id])?.remove(&id).unwrap_or_default();
            Ok(Some(UserWithPhotos { user, photos }))
        })
    }

    /// Records that the user did something just now.
    pub fn touch_last_active(&self, user_id: i64, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET last_active = ?2 WHERE id = ?1",
                params![user_id, at],
            )?;
            Ok(updated > 0)
        })
    }

    // -- Photos --

    pub fn get_photo(&self, id: i64) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM photos p WHERE p.id = ?1", PHOTO_COLUMNS);
            let row = conn.query_row(&sql, [id], PhotoRow::from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_main_photo_for_user(&self, user_id: i64) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM photos p WHERE p.user_id = ?1 AND p.is_main = 1 LIMIT 1",
                PHOTO_COLUMNS
            );
            let row = conn.query_row(&sql, [user_id], PhotoRow::from_row).optional()?;
            Ok(row)
        })
    }

    // -- Likes --

    pub fn get_like(&self, liker_id: i64, likee_id: i64) -> Result<Option<LikeRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT liker_id, likee_id FROM likes WHERE liker_id = ?1 AND likee_id = ?2",
                    [liker_id, likee_id],
                    |row| {
                        Ok(LikeRow {
                            liker_id: row.get(0)?,
                            likee_id: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Messages --

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages m WHERE m.id = ?1", MESSAGE_COLUMNS);
            let row = conn.query_row(&sql, [id], MessageRow::from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_message_view(&self, id: i64) -> Result<Option<MessageView>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {} FROM {} WHERE m.id = ?1",
                MESSAGE_COLUMNS, MESSAGE_VIEW_EXTRA_COLUMNS, MESSAGE_VIEW_FROM
            );
            let row = conn.query_row(&sql, [id], message_view_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_messages_for_user(&self, filter: &MessageFilter) -> Result<PagedList<MessageView>> {
        self.with_conn(|conn| {
            let columns = format!("{}, {}", MESSAGE_COLUMNS, MESSAGE_VIEW_EXTRA_COLUMNS);
            let mut query =
                PageQuery::new(columns, MESSAGE_VIEW_FROM, "m.message_sent_time DESC, m.id DESC");

            match filter.container {
                MessageContainer::Inbox => {
                    query.filter("m.recipient_id = ? AND m.recipient_deleted = 0", [filter.user_id]);
                }
                MessageContainer::Outbox => {
                    query.filter("m.sender_id = ? AND m.sender_deleted = 0", [filter.user_id]);
                }
                MessageContainer::Unread => {
                    query.filter(
                        "m.recipient_id = ? AND m.is_read = 0 AND m.recipient_deleted = 0",
                        [filter.user_id],
                    );
                }
            }

            paginate(conn, &query, filter.page, message_view_from_row)
        })
    }

    /// Conversation between two users, newest first. Each side's own
    /// soft-deleted copies are left out.
    pub fn get_message_thread(&self, user_id: i64, other_id: i64) -> Result<Vec<MessageView>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {} FROM {}
                 WHERE (m.recipient_id = ?1 AND m.sender_id = ?2 AND m.recipient_deleted = 0)
                    OR (m.recipient_id = ?2 AND m.sender_id = ?1 AND m.sender_deleted = 0)
                 ORDER BY m.message_sent_time DESC, m.id DESC",
                MESSAGE_COLUMNS, MESSAGE_VIEW_EXTRA_COLUMNS, MESSAGE_VIEW_FROM
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id, other_id], message_view_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn message_view_from_row(row: &Row<'_>) -> rusqlite::Result<MessageView> {
    Ok(MessageView {
        message: MessageRow::from_row(row)?,
        sender_known_as: row.get(9)?,
        sender_photo_url: row.get(10)?,
        recipient_known_as: row.get(11)?,
        recipient_photo_url: row.get(12)?,
    })
}

/// Batch-fetch photos for a set of users, grouped by owner.
fn photos_for_users(conn: &Connection, user_ids: &[i64]) -> Result<HashMap<i64, Vec<PhotoRow>>> {
    let mut grouped: HashMap<i64, Vec<PhotoRow>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders: Vec<String> = (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM photos p WHERE p.user_id IN ({}) ORDER BY p.id",
        PHOTO_COLUMNS,
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params_from_iter(user_ids.iter().map(|id| Value::Integer(*id))),
        PhotoRow::from_row,
    )?;

    for row in rows {
        let photo = row?;
        grouped.entry(photo.user_id).or_default().push(photo);
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::changes::ChangeSet;
    use crate::filters::birth_date_window;
    use crate::models::NewUser;
    use crate::pagination::PageRequest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn add_user(db: &Database, username: &str, gender: &str, born: NaiveDate) -> i64 {
        let new_user = NewUser {
            username: username.into(),
            gender: gender.into(),
            date_of_birth: Some(born),
            ..Default::default()
        };
        db.register(new_user, "password").unwrap().id
    }

    fn born_aged(age: u32) -> NaiveDate {
        birth_date_window(today(), age, age).1
    }

    fn browse(user_id: i64, gender: &str) -> UserFilter {
        UserFilter {
            user_id,
            gender: gender.into(),
            min_age: 18,
            max_age: 99,
            order: UserOrder::LastActive,
            likers: false,
            likees: false,
            today: today(),
            page: PageRequest::new(1, 10),
        }
    }

    fn usernames(page: &PagedList<UserWithPhotos>) -> Vec<String> {
        page.items.iter().map(|u| u.user.username.clone()).collect()
    }

    fn photo(user_id: i64, url: &str, is_main: bool) -> PhotoRow {
        PhotoRow {
            id: 0,
            url: url.into(),
            public_id: None,
            description: String::new(),
            date_added: Utc::now(),
            is_main,
            user_id,
        }
    }

    fn message(sender_id: i64, recipient_id: i64, content: &str, sent: DateTime<Utc>) -> MessageRow {
        MessageRow {
            id: 0,
            sender_id,
            recipient_id,
            content: content.into(),
            is_read: false,
            message_read_time: None,
            message_sent_time: sent,
            sender_deleted: false,
            recipient_deleted: false,
        }
    }

    fn send(db: &Database, row: MessageRow) -> i64 {
        let mut changes = ChangeSet::new();
        let staged = changes.add(row);
        db.save_all(changes).unwrap().id(staged).unwrap()
    }

    #[test]
    fn browse_excludes_self_and_other_genders() {
        let db = Database::open_in_memory().unwrap();
        let me = add_user(&db, "me", "female", born_aged(30));
        add_user(&db, "ann", "female", born_aged(25));
        add_user(&db, "bob", "male", born_aged(25));
        add_user(&db, "carl", "male", born_aged(40));

        let page = db.get_users(&browse(me, "male")).unwrap();
        let mut names = usernames(&page);
        names.sort();
        assert_eq!(names, vec!["bob", "carl"]);
        assert_eq!(page.total_count, 2);

        let page = db.get_users(&browse(me, "female")).unwrap();
        assert_eq!(usernames(&page), vec!["ann"]);
    }

    #[test]
    fn age_filter_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let me = add_user(&db, "me", "female", born_aged(30));
        let (_, youngest_allowed) = birth_date_window(today(), 21, 30);
        add_user(&db, "too_young", "male", youngest_allowed + Duration::days(1));
        add_user(&db, "just_min", "male", youngest_allowed);
        add_user(&db, "just_max", "male", born_aged(30));
        add_user(&db, "too_old", "male", born_aged(31));

        let mut filter = browse(me, "male");
        filter.min_age = 21;
        filter.max_age = 30;

        let mut names = usernames(&db.get_users(&filter).unwrap());
        names.sort();
        assert_eq!(names, vec!["just_max", "just_min"]);
    }

    #[test]
    fn likers_and_likees() {
        let db = Database::open_in_memory().unwrap();
        let me = add_user(&db, "me", "female", born_aged(30));
        let fan = add_user(&db, "fan", "male", born_aged(30));
        let crush = add_user(&db, "crush", "male", born_aged(30));
        add_user(&db, "stranger", "male", born_aged(30));

        let mut changes = ChangeSet::new();
        changes.add(LikeRow { liker_id: fan, likee_id: me });
        changes.add(LikeRow { liker_id: me, likee_id: crush });
        assert!(db.save_all(changes).unwrap().any());

        let mut filter = browse(me, "male");
        filter.likers = true;
        assert_eq!(usernames(&db.get_users(&filter).unwrap()), vec!["fan"]);

        let mut filter = browse(me, "male");
        filter.likees = true;
        assert_eq!(usernames(&db.get_users(&filter).unwrap()), vec!["crush"]);

        assert!(db.get_like(me, crush).unwrap().is_some());
        assert!(db.get_like(crush, me).unwrap().is_none());
    }

    #[test]
    fn duplicate_like_is_rejected_by_store() {
        let db = Database::open_in_memory().unwrap();
        let a = add_user(&db, "a", "female", born_aged(30));
        let b = add_user(&db, "b", "male", born_aged(30));

        let mut changes = ChangeSet::new();
        changes.add(LikeRow { liker_id: a, likee_id: b });
        db.save_all(changes).unwrap();

        let mut changes = ChangeSet::new();
        changes.add(LikeRow { liker_id: a, likee_id: b });
        assert!(db.save_all(changes).is_err());
    }

    #[test]
    fn order_by_created_or_last_active() {
        let db = Database::open_in_memory().unwrap();
        let me = add_user(&db, "me", "female", born_aged(30));
        let first = add_user(&db, "first", "male", born_aged(30));
        let second = add_user(&db, "second", "male", born_aged(30));

        let now = Utc::now();
        db.touch_last_active(first, now + Duration::hours(1)).unwrap();
        db.touch_last_active(second, now - Duration::hours(1)).unwrap();

        let page = db.get_users(&browse(me, "male")).unwrap();
        assert_eq!(usernames(&page), vec!["first", "second"]);

        let mut filter = browse(me, "male");
        filter.order = UserOrder::Created;
        let page = db.get_users(&filter).unwrap();
        assert_eq!(usernames(&page), vec!["second", "first"]);
    }

    #[test]
    fn photos_are_loaded_with_users() {
        let db = Database::open_in_memory().unwrap();
        let me = add_user(&db, "me", "female", born_aged(30));
        let bob = add_user(&db, "bob", "male", born_aged(30));

        let mut changes = ChangeSet::new();
        changes.add(photo(bob, "http://img/1", true));
        changes.add(photo(bob, "http://img/2", false));
        db.save_all(changes).unwrap();

        let page = db.get_users(&browse(me, "male")).unwrap();
        assert_eq!(page.items[0].photos.len(), 2);
        assert_eq!(page.items[0].main_photo_url(), Some("http://img/1"));

        let user = db.get_user(bob).unwrap().unwrap();
        assert_eq!(user.photos.len(), 2);
        assert!(db.get_user(9999).unwrap().is_none());
    }

    #[test]
    fn switching_main_photo_keeps_one_main() {
        let db = Database::open_in_memory().unwrap();
        let bob = add_user(&db, "bob", "male", born_aged(30));

        let mut changes = ChangeSet::new();
        changes.add(photo(bob, "http://img/1", true));
        let second = changes.add(photo(bob, "http://img/2", false));
        let second_id = db.save_all(changes).unwrap().id(second).unwrap();

        let mut current = db.get_main_photo_for_user(bob).unwrap().unwrap();
        let mut next = db.get_photo(second_id).unwrap().unwrap();
        current.is_main = false;
        next.is_main = true;

        let mut changes = ChangeSet::new();
        changes.update(current);
        changes.update(next);
        assert_eq!(db.save_all(changes).unwrap().affected(), 2);

        let user = db.get_user(bob).unwrap().unwrap();
        let mains: Vec<i64> = user.photos.iter().filter(|p| p.is_main).map(|p| p.id).collect();
        assert_eq!(mains, vec![second_id]);
    }

    #[test]
    fn message_containers() {
        let db = Database::open_in_memory().unwrap();
        let ann = add_user(&db, "ann", "female", born_aged(30));
        let bob = add_user(&db, "bob", "male", born_aged(30));
        let now = Utc::now();

        send(&db, message(bob, ann, "hi ann", now - Duration::minutes(2)));
        let read_id = send(&db, message(bob, ann, "again", now - Duration::minutes(1)));
        send(&db, message(ann, bob, "hi bob", now));

        let mut read = db.get_message(read_id).unwrap().unwrap();
        read.is_read = true;
        read.message_read_time = Some(now);
        let mut changes = ChangeSet::new();
        changes.update(read);
        db.save_all(changes).unwrap();

        let filter = |user_id, container| MessageFilter {
            user_id,
            container,
            page: PageRequest::new(1, 10),
        };
        let contents = |page: PagedList<MessageView>| -> Vec<String> {
            page.items.into_iter().map(|m| m.message.content).collect()
        };

        let inbox = db.get_messages_for_user(&filter(ann, MessageContainer::Inbox)).unwrap();
        assert_eq!(contents(inbox), vec!["again", "hi ann"]);

        let unread = db.get_messages_for_user(&filter(ann, MessageContainer::Unread)).unwrap();
        assert_eq!(contents(unread), vec!["hi ann"]);

        let outbox = db.get_messages_for_user(&filter(ann, MessageContainer::Outbox)).unwrap();
        let outbox_items = outbox.items.clone();
        assert_eq!(contents(outbox), vec!["hi bob"]);
        assert_eq!(outbox_items[0].sender_known_as, "ann");
        assert_eq!(outbox_items[0].recipient_known_as, "bob");
    }

    #[test]
    fn thread_hides_own_deleted_copies() {
        let db = Database::open_in_memory().unwrap();
        let ann = add_user(&db, "ann", "female", born_aged(30));
        let bob = add_user(&db, "bob", "male", born_aged(30));
        let carl = add_user(&db, "carl", "male", born_aged(30));
        let now = Utc::now();

        let first = send(&db, message(ann, bob, "one", now - Duration::minutes(2)));
        send(&db, message(bob, ann, "two", now - Duration::minutes(1)));
        send(&db, message(carl, ann, "elsewhere", now));

        let thread = db.get_message_thread(ann, bob).unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.message.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "one"]);

        let mut row = db.get_message(first).unwrap().unwrap();
        assert!(row.mark_deleted_by(ann));
        let mut changes = ChangeSet::new();
        changes.update(row);
        db.save_all(changes).unwrap();

        assert_eq!(db.get_message_thread(ann, bob).unwrap().len(), 1);
        assert_eq!(db.get_message_thread(bob, ann).unwrap().len(), 2);
    }

    #[test]
    fn message_removed_after_both_sides_delete() {
        let db = Database::open_in_memory().unwrap();
        let ann = add_user(&db, "ann", "female", born_aged(30));
        let bob = add_user(&db, "bob", "male", born_aged(30));
        let id = send(&db, message(ann, bob, "bye", Utc::now()));

        let mut row = db.get_message(id).unwrap().unwrap();
        row.mark_deleted_by(ann);
        assert!(row.sender_deleted);
        assert!(!row.is_deleted_by_both());
        let mut changes = ChangeSet::new();
        changes.update(row);
        db.save_all(changes).unwrap();

        let mut row = db.get_message(id).unwrap().expect("still visible to recipient");
        assert!(!row.mark_deleted_by(9999));
        row.mark_deleted_by(bob);
        assert!(row.is_deleted_by_both());
        let mut changes = ChangeSet::new();
        changes.delete(row);
        assert!(db.save_all(changes).unwrap().any());

        assert!(db.get_message(id).unwrap().is_none());
    }

    #[test]
    fn empty_change_set_saves_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.save_all(ChangeSet::new()).unwrap().any());
    }
}

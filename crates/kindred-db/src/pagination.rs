use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};

pub const MAX_PAGE_SIZE: u32 = 50;

/// Which slice of a result set to return. Page numbers start at 1 and are
/// not checked against the result size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn offset(&self) -> i64 {
        i64::from(self.page_number.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: PageRequest) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page.page_size)) as u32;
        Self {
            items,
            current_page: page.page_number,
            page_size: page.page_size,
            total_count,
            total_pages,
        }
    }

    /// Converts the items, keeping the counts.
    pub fn map<U, F>(self, f: F) -> PagedList<U>
    where
        F: FnMut(T) -> U,
    {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// A filtered SELECT kept in pieces so it can be counted and sliced with the
/// same conditions.
pub struct PageQuery {
    pub columns: String,
    pub from: String,
    conditions: Vec<String>,
    params: Vec<Value>,
    pub order_by: String,
}

impl PageQuery {
    pub fn new(columns: impl Into<String>, from: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            columns: columns.into(),
            from: from.into(),
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: order_by.into(),
        }
    }

    /// Adds a condition. Placeholders must be bare `?`; they bind in the
    /// order conditions are added.
    pub fn filter<I>(&mut self, condition: &str, params: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.conditions.push(format!("({})", condition));
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// Counts the full filtered set, then reads one page of it.
pub fn paginate<T, F>(
    conn: &Connection,
    query: &PageQuery,
    page: PageRequest,
    map: F,
) -> Result<PagedList<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let where_clause = query.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", query.from, where_clause);
    let total_count: i64 =
        conn.query_row(&count_sql, params_from_iter(query.params.iter()), |row| row.get(0))?;

    let page_sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
        query.columns, query.from, where_clause, query.order_by
    );
    let mut params = query.params.clone();
    params.push(Value::Integer(i64::from(page.page_size)));
    params.push(Value::Integer(page.offset()));

    let mut stmt = conn.prepare(&page_sql)?;
    let items = stmt
        .query_map(params_from_iter(params.iter()), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(PagedList::new(items, total_count as u64, page))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(count: i64) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE numbers (n INTEGER NOT NULL);").unwrap();
        for n in 1..=count {
            conn.execute("INSERT INTO numbers (n) VALUES (?1)", [n]).unwrap();
        }
        conn
    }

    fn all_numbers() -> PageQuery {
        PageQuery::new("n", "numbers", "n ASC")
    }

    #[test]
    fn empty_set_has_no_pages() {
        let conn = numbers(0);
        let page = paginate(&conn, &all_numbers(), PageRequest::new(1, 10), |r| r.get::<_, i64>(0))
            .unwrap();

        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn last_page_is_partial() {
        let conn = numbers(23);
        let page = paginate(&conn, &all_numbers(), PageRequest::new(3, 10), |r| r.get::<_, i64>(0))
            .unwrap();

        assert_eq!(page.total_count, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.items, vec![21, 22, 23]);
    }

    #[test]
    fn out_of_range_page_is_empty_with_totals() {
        let conn = numbers(23);
        let page = paginate(&conn, &all_numbers(), PageRequest::new(7, 10), |r| r.get::<_, i64>(0))
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 23);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(1, 500).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(1, 0).page_size, 1);
    }

    #[test]
    fn filters_apply_to_count_and_items() {
        let conn = numbers(23);
        let mut query = all_numbers();
        query.filter("n > ?", [Value::Integer(5)]).filter("n % 2 = ?", [Value::Integer(0)]);

        let page = paginate(&conn, &query, PageRequest::new(1, 4), |r| r.get::<_, i64>(0)).unwrap();

        assert_eq!(page.total_count, 9);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items, vec![6, 8, 10, 12]);
    }
}

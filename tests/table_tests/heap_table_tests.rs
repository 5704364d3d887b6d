//! Tests for HeapTable
//!
//! These tests verify:
//! - Insert / select / project round trips
//! - Spilling into new blocks when the last block is full
//! - Update in place (shrink and grow) and delete
//! - Lifecycle: create, create_if_not_exists, open, close, drop
//! - Persistence across reopen with the file backend

use heapdb::config::Config;
use heapdb::storage::MAX_RECORD_SIZE;
use heapdb::table::{ColumnAttribute, DataType, DbRelation, Handle, HeapTable, Row, Value};
use heapdb::{DbError, StoreEnv};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_file_env() -> (TempDir, StoreEnv) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let env = StoreEnv::open(config).unwrap();
    (temp_dir, env)
}

fn table(env: &StoreEnv, name: &str) -> HeapTable {
    HeapTable::new(
        env,
        name,
        vec!["a".to_string(), "b".to_string()],
        vec![
            ColumnAttribute::new(DataType::Int),
            ColumnAttribute::new(DataType::Text),
        ],
    )
    .unwrap()
}

fn created_table(env: &StoreEnv, name: &str) -> HeapTable {
    let mut table = table(env, name);
    table.create().unwrap();
    table
}

fn row(a: i32, b: &str) -> Row {
    let mut row = Row::new();
    row.insert("a".to_string(), Value::from(a));
    row.insert("b".to_string(), Value::from(b));
    row
}

/// Row whose record is 1006 bytes; four of them fill a block
fn wide_row(a: i32) -> Row {
    row(a, &"w".repeat(1000))
}

// =============================================================================
// Insert / Select / Project Tests
// =============================================================================

#[test]
fn test_insert_select_project() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");

    let handle = table.insert(&row(12, "Hello!")).unwrap();

    assert_eq!(handle, Handle::new(1, 1));
    assert_eq!(table.select().unwrap(), vec![handle]);
    assert_eq!(table.project(handle).unwrap(), row(12, "Hello!"));
}

#[test]
fn test_insert_drops_extra_columns() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let mut input = row(1, "one");
    input.insert("c".to_string(), Value::Int(3));

    let handle = table.insert(&input).unwrap();

    assert_eq!(table.project(handle).unwrap(), row(1, "one"));
}

#[test]
fn test_select_returns_insertion_order() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");

    let inserted: Vec<Handle> = (0..10)
        .map(|i| table.insert(&row(i, &format!("row {}", i))).unwrap())
        .collect();

    assert_eq!(table.select().unwrap(), inserted);
    for (i, handle) in inserted.iter().enumerate() {
        assert_eq!(
            table.project(*handle).unwrap(),
            row(i as i32, &format!("row {}", i))
        );
    }
}

#[test]
fn test_insert_spills_into_new_block() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");

    let handles: Vec<Handle> = (0..5).map(|i| table.insert(&wide_row(i)).unwrap()).collect();

    assert_eq!(
        handles,
        vec![
            Handle::new(1, 1),
            Handle::new(1, 2),
            Handle::new(1, 3),
            Handle::new(1, 4),
            Handle::new(2, 1),
        ]
    );
    assert_eq!(table.file().last_block_id(), 2);
    assert_eq!(table.select().unwrap(), handles);
    assert_eq!(table.project(Handle::new(2, 1)).unwrap(), wide_row(4));
}

#[test]
fn test_small_row_after_spill_goes_to_last_block() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    for i in 0..5 {
        table.insert(&wide_row(i)).unwrap();
    }

    // Block 1 still has a little room, but inserts only try the last block
    let handle = table.insert(&row(0, "")).unwrap();

    assert_eq!(handle, Handle::new(2, 2));
}

#[test]
fn test_project_columns() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let handle = table.insert(&row(7, "seven")).unwrap();

    let only_b = table.project_columns(handle, &["b"]).unwrap();
    let with_unknown = table.project_columns(handle, &["a", "nope"]).unwrap();
    let none = table.project_columns(handle, &[]).unwrap();

    let mut expected_b = Row::new();
    expected_b.insert("b".to_string(), Value::from("seven"));
    assert_eq!(only_b, expected_b);

    let mut expected_a = Row::new();
    expected_a.insert("a".to_string(), Value::Int(7));
    assert_eq!(with_unknown, expected_a);

    assert!(none.is_empty());
}

#[test]
fn test_select_where() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let first = table.insert(&row(1, "x")).unwrap();
    table.insert(&row(2, "y")).unwrap();
    let third = table.insert(&row(1, "z")).unwrap();

    let mut clause = Row::new();
    clause.insert("a".to_string(), Value::Int(1));
    assert_eq!(table.select_where(&clause).unwrap(), vec![first, third]);

    clause.insert("b".to_string(), Value::from("z"));
    assert_eq!(table.select_where(&clause).unwrap(), vec![third]);

    assert_eq!(table.select_where(&Row::new()).unwrap().len(), 3);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_invalid_insert_stores_nothing() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");

    let mut missing = Row::new();
    missing.insert("a".to_string(), Value::Int(1));
    let mut mistyped = row(1, "ok");
    mistyped.insert("a".to_string(), Value::from("one"));
    let too_large = row(1, &"x".repeat(5000));

    assert!(matches!(table.insert(&missing), Err(DbError::SchemaMismatch(_))));
    assert!(matches!(table.insert(&mistyped), Err(DbError::SchemaMismatch(_))));
    assert!(matches!(
        table.insert(&too_large),
        Err(DbError::RecordTooLarge { .. })
    ));
    assert!(table.select().unwrap().is_empty());
}

#[test]
fn test_boolean_column_unsupported() {
    let env = StoreEnv::in_memory();
    let mut table = HeapTable::new(
        &env,
        "flags",
        vec!["flag".to_string()],
        vec![ColumnAttribute::new(DataType::Boolean)],
    )
    .unwrap();
    table.create().unwrap();
    let mut input = Row::new();
    input.insert("flag".to_string(), Value::from(true));

    assert!(matches!(
        table.insert(&input),
        Err(DbError::UnsupportedType(DataType::Boolean))
    ));
}

#[test]
fn test_project_unknown_handles() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    table.insert(&row(1, "a")).unwrap();

    assert!(matches!(
        table.project(Handle::new(1, 2)),
        Err(DbError::RecordNotFound { block_id: 1, record_id: 2 })
    ));
    assert!(matches!(
        table.project(Handle::new(9, 1)),
        Err(DbError::BlockNotFound(9))
    ));
}

#[test]
fn test_append_oversized_record_allocates_nothing() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");

    for _ in 0..3 {
        let result = table.append(&[0u8; 5000]);
        assert!(matches!(
            result,
            Err(DbError::RecordTooLarge { size: 5000, max }) if max == MAX_RECORD_SIZE
        ));
    }

    assert_eq!(table.file().last_block_id(), 1);
    assert_eq!(table.insert(&row(1, "a")).unwrap(), Handle::new(1, 1));
}

#[test]
fn test_append_largest_record_into_fresh_block() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    table.insert(&row(1, "a")).unwrap();

    let handle = table.append(&vec![0u8; MAX_RECORD_SIZE]).unwrap();

    assert_eq!(handle, Handle::new(2, 1));
    assert_eq!(table.file().last_block_id(), 2);
}

#[test]
fn test_two_tables_spilling_keep_each_others_rows() {
    let env = StoreEnv::in_memory();
    let mut first = created_table(&env, "t");
    let mut second = table(&env, "t");
    second.open().unwrap();

    let mut first_handles = Vec::new();
    for i in 0..5 {
        first_handles.push(first.insert(&wide_row(i)).unwrap());
    }
    assert_eq!(first_handles[4], Handle::new(2, 1));

    // The second table still believes block 1 is the last one
    let mut second_handles = Vec::new();
    for i in 100..102 {
        second_handles.push(second.insert(&wide_row(i)).unwrap());
    }

    assert_eq!(second_handles[0].block_id, 3);
    assert_eq!(first.project(first_handles[4]).unwrap(), wide_row(4));
    assert_eq!(second.project(second_handles[1]).unwrap(), wide_row(101));
    assert_eq!(second.select().unwrap().len(), 7);
}

// =============================================================================
// Update / Delete Tests
// =============================================================================

#[test]
fn test_update_merges_columns() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let handle = table.insert(&row(1, "original text")).unwrap();

    let mut changes = Row::new();
    changes.insert("b".to_string(), Value::from("short"));
    table.update(handle, &changes).unwrap();

    assert_eq!(table.project(handle).unwrap(), row(1, "short"));
}

#[test]
fn test_update_keeps_neighbors_intact() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let first = table.insert(&row(1, "first")).unwrap();
    let second = table.insert(&row(2, "second")).unwrap();
    let third = table.insert(&row(3, "third")).unwrap();

    let mut grow = Row::new();
    grow.insert("b".to_string(), Value::from("a much longer second value"));
    table.update(second, &grow).unwrap();

    assert_eq!(table.project(first).unwrap(), row(1, "first"));
    assert_eq!(
        table.project(second).unwrap(),
        row(2, "a much longer second value")
    );
    assert_eq!(table.project(third).unwrap(), row(3, "third"));
    assert_eq!(table.select().unwrap(), vec![first, second, third]);
}

#[test]
fn test_update_grow_until_block_full() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let handles: Vec<Handle> = (0..4).map(|i| table.insert(&wide_row(i)).unwrap()).collect();

    // Four 1006-byte records leave 47 bytes between the header and the data
    let mut grow = Row::new();
    grow.insert("b".to_string(), Value::from("w".repeat(1047)));
    table.update(handles[0], &grow).unwrap();

    let mut overgrow = Row::new();
    overgrow.insert("b".to_string(), Value::from("w".repeat(1001)));
    let result = table.update(handles[1], &overgrow);

    assert!(matches!(
        result,
        Err(DbError::OutOfSpace { block_id: 1, requested: 1 })
    ));
    assert_eq!(table.project(handles[1]).unwrap(), wide_row(1));
    assert_eq!(table.project(handles[0]).unwrap(), row(0, &"w".repeat(1047)));
}

#[test]
fn test_update_invalid_values() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let handle = table.insert(&row(1, "a")).unwrap();

    let mut changes = Row::new();
    changes.insert("a".to_string(), Value::from("not an int"));

    assert!(matches!(
        table.update(handle, &changes),
        Err(DbError::SchemaMismatch(_))
    ));
    assert_eq!(table.project(handle).unwrap(), row(1, "a"));
}

#[test]
fn test_del_removes_row() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let first = table.insert(&row(1, "first")).unwrap();
    let second = table.insert(&row(2, "second")).unwrap();

    table.del(first).unwrap();

    assert_eq!(table.select().unwrap(), vec![second]);
    assert_eq!(table.project(second).unwrap(), row(2, "second"));
    assert!(matches!(
        table.project(first),
        Err(DbError::RecordNotFound { .. })
    ));
    assert!(matches!(table.del(first), Err(DbError::RecordNotFound { .. })));
}

#[test]
fn test_del_does_not_reuse_handles() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    let first = table.insert(&row(1, "a")).unwrap();
    table.del(first).unwrap();

    let next = table.insert(&row(2, "b")).unwrap();

    assert_eq!(next, Handle::new(1, 2));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_create_twice_fails() {
    let env = StoreEnv::in_memory();
    created_table(&env, "t");

    let mut again = table(&env, "t");

    assert!(matches!(again.create(), Err(DbError::AlreadyExists(_))));
}

#[test]
fn test_create_if_not_exists_keeps_rows() {
    let env = StoreEnv::in_memory();
    let mut original = created_table(&env, "t");
    let handle = original.insert(&row(5, "kept")).unwrap();
    original.close().unwrap();

    let mut again = table(&env, "t");
    again.create_if_not_exists().unwrap();

    assert!(again.is_open());
    assert_eq!(again.select().unwrap(), vec![handle]);
    assert_eq!(again.project(handle).unwrap(), row(5, "kept"));
}

#[test]
fn test_row_operations_open_closed_table() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    table.close().unwrap();
    assert!(!table.is_open());

    let handle = table.insert(&row(1, "auto")).unwrap();

    assert!(table.is_open());
    table.close().unwrap();
    assert_eq!(table.select().unwrap(), vec![handle]);
    table.close().unwrap();
    assert_eq!(table.project(handle).unwrap(), row(1, "auto"));
}

#[test]
fn test_drop_then_open_fails() {
    let env = StoreEnv::in_memory();
    let mut table = created_table(&env, "t");
    table.insert(&row(1, "a")).unwrap();

    table.drop().unwrap();

    assert!(matches!(table.open(), Err(DbError::RelationNotFound(_))));
    assert!(matches!(table.drop(), Err(DbError::RelationNotFound(_))));
}

#[test]
fn test_operations_on_missing_table() {
    let env = StoreEnv::in_memory();
    let mut table = table(&env, "never_created");

    assert!(matches!(
        table.insert(&row(1, "a")),
        Err(DbError::RelationNotFound(_))
    ));
    assert!(matches!(table.select(), Err(DbError::RelationNotFound(_))));
}

#[test]
fn test_rows_persist_across_reopen() {
    let (_temp, env) = setup_file_env();
    let handles: Vec<Handle> = {
        let mut table = created_table(&env, "people");
        let handles: Vec<Handle> = (0..6)
            .map(|i| table.insert(&wide_row(i)).unwrap())
            .collect();
        table.close().unwrap();
        handles
    };

    let mut reopened = table(&env, "people");
    reopened.open().unwrap();

    assert_eq!(reopened.file().last_block_id(), 2);
    assert_eq!(reopened.select().unwrap(), handles);
    for (i, handle) in handles.iter().enumerate() {
        assert_eq!(reopened.project(*handle).unwrap(), wide_row(i as i32));
    }
}

#[test]
fn test_accessors() {
    let env = StoreEnv::in_memory();
    let table = table(&env, "t");

    assert_eq!(table.name(), "t");
    assert_eq!(table.column_names(), &["a".to_string(), "b".to_string()]);
    assert!(!table.is_open());
    assert_eq!(table.validate(&row(1, "x")).unwrap(), row(1, "x"));
}

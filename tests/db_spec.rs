use goalboard::db::Database;
use goalboard::error::StoreError;
use goalboard::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_goal(db: &Database, title: &str, categories: &[&str]) -> Goal {
    db.create_goal(GoalInput::new(title, "kim", categories))
        .expect("Failed to create goal")
}

fn sub_goal(title: &str, owner: &str, progress: i32) -> SubGoalInput {
    SubGoalInput {
        id: None,
        title: title.to_string(),
        description: None,
        owner: owner.to_string(),
        progress,
        start_date: None,
        due_date: None,
        status_note: None,
    }
}

fn orders(db: &Database) -> Vec<(String, u32)> {
    db.list_goals()
        .expect("Failed to list goals")
        .into_iter()
        .map(|g| (g.title, g.order))
        .collect()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "categories" {
        describe "create_category" {
            it "creates a category with a color" {
                let category = db.create_category(CreateCategoryInput {
                    name: "SERVICE".to_string(),
                    color: "#3b82f6".to_string(),
                }).expect("Failed to create category");

                assert_eq!(category.name.as_str(), "SERVICE");
                assert_eq!(category.color, "#3b82f6");
            }

            it "rejects a duplicate name" {
                let input = CreateCategoryInput { name: "AI".to_string(), color: "#fff".to_string() };
                db.create_category(input.clone()).expect("Failed to create category");

                let result = db.create_category(input);
                assert!(matches!(result, Err(StoreError::Conflict(_))));
            }

            it "rejects a blank name" {
                let result = db.create_category(CreateCategoryInput {
                    name: "  ".to_string(),
                    color: "#fff".to_string(),
                });
                assert!(matches!(result, Err(StoreError::Validation(_))));
            }
        }

        describe "update_category" {
            it "propagates a rename to every referencing goal" {
                let a = create_goal(&db, "A", &["OPS"]);
                let b = create_goal(&db, "B", &["OPS", "AI"]);
                let ops = db.find_category_by_name(&CategoryName::new("OPS").unwrap())
                    .unwrap()
                    .unwrap();

                db.update_category(ops.id, UpdateCategoryInput {
                    name: Some("OPERATIONS".to_string()),
                    color: None,
                }).expect("Update failed").expect("Category missing");

                let a = db.get_goal(a.id).unwrap().unwrap();
                let b = db.get_goal(b.id).unwrap().unwrap();
                assert!(a.categories.iter().any(|c| c == "OPERATIONS"));
                assert!(b.categories.iter().any(|c| c == "OPERATIONS"));
                assert!(!b.categories.iter().any(|c| c == "OPS"));
            }

            it "refuses to rename onto an existing name" {
                create_goal(&db, "A", &["AI", "SERVICE"]);
                let ai = db.find_category_by_name(&CategoryName::new("AI").unwrap())
                    .unwrap()
                    .unwrap();

                let result = db.update_category(ai.id, UpdateCategoryInput {
                    name: Some("SERVICE".to_string()),
                    color: None,
                });
                assert!(matches!(result, Err(StoreError::Conflict(_))));
            }

            it "returns None for an unknown category" {
                let result = db.update_category(Uuid::new_v4(), UpdateCategoryInput::default())
                    .expect("Query failed");
                assert!(result.is_none());
            }
        }

        describe "delete_category" {
            it "refuses while a goal references it" {
                create_goal(&db, "A", &["AI"]);
                let ai = db.find_category_by_name(&CategoryName::new("AI").unwrap())
                    .unwrap()
                    .unwrap();

                let result = db.delete_category(ai.id);
                assert!(matches!(result, Err(StoreError::Conflict(_))));
                assert_eq!(db.list_categories().unwrap().len(), 1);
            }

            it "deletes an unreferenced category" {
                let category = db.create_category(CreateCategoryInput {
                    name: "SPARE".to_string(),
                    color: "#fff".to_string(),
                }).unwrap();

                assert!(db.delete_category(category.id).unwrap());
                assert!(db.list_categories().unwrap().is_empty());
            }

            it "returns false for an unknown category" {
                assert!(!db.delete_category(Uuid::new_v4()).unwrap());
            }
        }
    }

    describe "goals" {
        describe "create_goal" {
            it "appends goals with increasing order" {
                create_goal(&db, "A", &["AI"]);
                create_goal(&db, "B", &["AI"]);
                create_goal(&db, "C", &["AI"]);

                assert_eq!(orders(&db), vec![
                    ("A".to_string(), 0),
                    ("B".to_string(), 1),
                    ("C".to_string(), 2),
                ]);
            }

            it "auto-creates unknown categories with the default color" {
                create_goal(&db, "A", &["BRAND NEW"]);

                let categories = db.list_categories().unwrap();
                assert_eq!(categories.len(), 1);
                assert_eq!(categories[0].name.as_str(), "BRAND NEW");
                assert_eq!(categories[0].color, DEFAULT_CATEGORY_COLOR);
            }

            it "rejects six categories and writes nothing" {
                let result = db.create_goal(GoalInput::new("A", "kim", &["a", "b", "c", "d", "e", "f"]));

                assert!(matches!(result, Err(StoreError::Validation(_))));
                assert!(db.list_goals().unwrap().is_empty());
                assert!(db.list_categories().unwrap().is_empty());
            }

            it "derives progress from sub-goals" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.progress = 5;
                input.sub_goals = vec![sub_goal("one", "lee", 40), sub_goal("two", "kim", 81)];

                let goal = db.create_goal(input).expect("Failed to create goal");
                assert_eq!(goal.progress, 61);
                assert_eq!(goal.sub_goals.len(), 2);
                assert_eq!(goal.sub_goals[0].title, "one");
            }

            it "stores size and dates" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.size = GoalSize::Xl;
                input.due_date = chrono::NaiveDate::from_ymd_opt(2025, 6, 30);

                let goal = db.create_goal(input).unwrap();
                let loaded = db.get_goal(goal.id).unwrap().unwrap();
                assert_eq!(loaded.size, GoalSize::Xl);
                assert_eq!(loaded.due_date, chrono::NaiveDate::from_ymd_opt(2025, 6, 30));
            }
        }

        describe "update_goal" {
            it "replaces sub-goals and notes while keeping order" {
                create_goal(&db, "first", &["AI"]);
                let goal = create_goal(&db, "second", &["AI"]);

                let mut input = goal.to_input();
                input.title = "second, renamed".to_string();
                input.sub_goals = vec![sub_goal("only", "lee", 70)];
                input.notes = vec![NoteInput {
                    id: None,
                    content: "see https://example.com".to_string(),
                    is_pinned: true,
                    created_at: None,
                }];

                let updated = db.update_goal(goal.id, input).unwrap().unwrap();
                assert_eq!(updated.title, "second, renamed");
                assert_eq!(updated.order, 1);
                assert_eq!(updated.progress, 70);
                assert_eq!(updated.notes.len(), 1);
                assert!(updated.notes[0].is_pinned);
                assert_eq!(updated.notes[0].links(), vec!["https://example.com"]);
            }

            it "keeps note ids and timestamps across a full replace" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.notes = vec![NoteInput {
                    id: None,
                    content: "kickoff".to_string(),
                    is_pinned: false,
                    created_at: None,
                }];
                let goal = db.create_goal(input).unwrap();
                let note = goal.notes[0].clone();

                let updated = db.update_goal(goal.id, goal.to_input()).unwrap().unwrap();
                assert_eq!(updated.notes[0].id, note.id);
                assert_eq!(updated.notes[0].created_at, note.created_at);
            }

            it "resets progress to zero when the last sub-goal is removed" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.sub_goals = vec![sub_goal("one", "kim", 90)];
                let goal = db.create_goal(input).unwrap();

                let mut input = goal.to_input();
                input.sub_goals.clear();
                assert_eq!(input.progress, 90);

                let updated = db.update_goal(goal.id, input).unwrap().unwrap();
                assert_eq!(updated.progress, 0);
            }

            it "keeps manual progress on a goal that never had sub-goals" {
                let goal = create_goal(&db, "A", &["AI"]);
                let mut input = goal.to_input();
                input.progress = 35;

                let updated = db.update_goal(goal.id, input).unwrap().unwrap();
                assert_eq!(updated.progress, 35);
            }

            it "returns None for an unknown goal" {
                let result = db.update_goal(Uuid::new_v4(), GoalInput::new("A", "kim", &["AI"]))
                    .expect("Query failed");
                assert!(result.is_none());
            }

            it "returns None for an unknown goal even with invalid input" {
                let result = db.update_goal(Uuid::new_v4(), GoalInput::new("A", "kim", &[]))
                    .expect("Query failed");
                assert!(result.is_none());
            }

            it "rejects a repeated sub-goal id and keeps the stored goal" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.sub_goals = vec![sub_goal("one", "kim", 20)];
                let goal = db.create_goal(input).unwrap();

                let mut input = goal.to_input();
                let repeated = input.sub_goals[0].clone();
                input.sub_goals.push(repeated);

                let result = db.update_goal(goal.id, input);
                assert!(matches!(result, Err(StoreError::Validation(_))));
                assert_eq!(db.get_goal(goal.id).unwrap().unwrap().sub_goals.len(), 1);
            }

            it "rejects a repeated note id" {
                let note = NoteInput {
                    id: Some(Uuid::new_v4()),
                    content: "kickoff".to_string(),
                    is_pinned: false,
                    created_at: None,
                };
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.notes = vec![note.clone(), note];

                let result = db.create_goal(input);
                assert!(matches!(result, Err(StoreError::Validation(_))));
                assert!(db.list_goals().unwrap().is_empty());
            }

            it "refuses a sub-goal id owned by another goal" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.sub_goals = vec![sub_goal("one", "kim", 20)];
                let a = db.create_goal(input).unwrap();
                let b = create_goal(&db, "B", &["AI"]);

                let mut input = b.to_input();
                input.sub_goals = a.to_input().sub_goals;

                let result = db.update_goal(b.id, input);
                assert!(matches!(result, Err(StoreError::Conflict(_))));
                assert!(db.get_goal(b.id).unwrap().unwrap().sub_goals.is_empty());
                assert_eq!(db.get_goal(a.id).unwrap().unwrap().sub_goals.len(), 1);
            }

            it "refuses a note id owned by another goal" {
                let mut input = GoalInput::new("A", "kim", &["AI"]);
                input.notes = vec![NoteInput {
                    id: None,
                    content: "kickoff".to_string(),
                    is_pinned: false,
                    created_at: None,
                }];
                let a = db.create_goal(input).unwrap();

                let mut input = GoalInput::new("B", "kim", &["AI"]);
                input.notes = a.to_input().notes;

                let result = db.create_goal(input);
                assert!(matches!(result, Err(StoreError::Conflict(_))));
                assert_eq!(orders(&db), vec![("A".to_string(), 0)]);
            }

            it "rejects progress above 100" {
                let goal = create_goal(&db, "A", &["AI"]);
                let mut input = goal.to_input();
                input.progress = 150;

                let result = db.update_goal(goal.id, input);
                assert!(matches!(result, Err(StoreError::Validation(_))));
                assert_eq!(db.get_goal(goal.id).unwrap().unwrap().progress, 0);
            }
        }

        describe "delete_goal" {
            it "cascades sub-goals and compacts order" {
                create_goal(&db, "A", &["AI"]);
                let mut input = GoalInput::new("B", "lee", &["AI"]);
                input.sub_goals = vec![sub_goal("child", "park", 10)];
                let b = db.create_goal(input).unwrap();
                create_goal(&db, "C", &["AI"]);

                assert!(db.delete_goal(b.id).unwrap());
                assert_eq!(orders(&db), vec![("A".to_string(), 0), ("C".to_string(), 1)]);
                assert!(!db.owners().unwrap().contains(&"park".to_string()));
            }

            it "returns false for an unknown goal" {
                assert!(!db.delete_goal(Uuid::new_v4()).unwrap());
            }
        }

        describe "reorder_goals" {
            it "applies a dense batch" {
                let a = create_goal(&db, "A", &["AI"]);
                let b = create_goal(&db, "B", &["AI"]);
                let c = create_goal(&db, "C", &["AI"]);

                db.reorder_goals(&[
                    ReorderEntry { id: c.id, order: 0 },
                    ReorderEntry { id: a.id, order: 1 },
                    ReorderEntry { id: b.id, order: 2 },
                ]).expect("Reorder failed");

                assert_eq!(orders(&db), vec![
                    ("C".to_string(), 0),
                    ("A".to_string(), 1),
                    ("B".to_string(), 2),
                ]);
            }

            it "rolls back a batch that leaves a duplicate order" {
                let a = create_goal(&db, "A", &["AI"]);
                create_goal(&db, "B", &["AI"]);

                let result = db.reorder_goals(&[ReorderEntry { id: a.id, order: 1 }]);
                assert!(matches!(result, Err(StoreError::Validation(_))));
                assert_eq!(orders(&db), vec![("A".to_string(), 0), ("B".to_string(), 1)]);
            }

            it "rolls back a batch with an unknown goal" {
                let a = create_goal(&db, "A", &["AI"]);
                let b = create_goal(&db, "B", &["AI"]);

                let result = db.reorder_goals(&[
                    ReorderEntry { id: b.id, order: 0 },
                    ReorderEntry { id: a.id, order: 1 },
                    ReorderEntry { id: Uuid::new_v4(), order: 2 },
                ]);
                assert!(matches!(result, Err(StoreError::NotFound { .. })));
                assert_eq!(orders(&db), vec![("A".to_string(), 0), ("B".to_string(), 1)]);
            }
        }
    }

    describe "owners" {
        it "lists goal and sub-goal owners once, sorted" {
            let mut input = GoalInput::new("A", "kim", &["AI"]);
            input.sub_goals = vec![sub_goal("x", "lee", 0), sub_goal("y", "kim", 0)];
            db.create_goal(input).unwrap();
            db.create_goal(GoalInput::new("B", "choi", &["AI"])).unwrap();

            assert_eq!(db.owners().unwrap(), vec!["choi", "kim", "lee"]);
        }
    }

    describe "file database" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("board.db");

            {
                let file_db = Database::open(path.clone()).expect("Failed to open database");
                file_db.migrate().unwrap();
                create_goal(&file_db, "Durable", &["AI"]);
            }

            let reopened = Database::open(path).expect("Failed to reopen database");
            reopened.migrate().unwrap();
            let goals = reopened.list_goals().unwrap();
            assert_eq!(goals.len(), 1);
            assert_eq!(goals[0].title, "Durable");
        }
    }
}

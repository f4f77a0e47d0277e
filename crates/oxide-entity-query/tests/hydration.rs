mod common;

use common::{blog, inheritance, postgres, row, text};
use oxide_entity_core::value::SqlValue;
use oxide_entity_query::{FieldValue, Hydrator, QueryError, SelectQuery};

#[test]
fn joined_rows_collapse_into_one_parent() {
    let registry = blog(postgres());
    let select = SelectQuery::new(&registry, "User", "user")
        .unwrap()
        .left_join_and_select("user.posts", "post")
        .build()
        .unwrap();
    let user = |post: i64, title: &str| {
        row(&[
            ("user_id", SqlValue::Int(1)),
            ("user_name", text("ann")),
            ("user_ipv6", SqlValue::Null),
            ("post_id", SqlValue::Int(post)),
            ("post_title", text(title)),
            ("post_author_id", SqlValue::Int(1)),
        ])
    };
    let rows = vec![user(10, "a"), user(11, "b"), user(12, "c")];

    let users = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap();
    assert_eq!(users.len(), 1);
    let posts = users[0].many("posts");
    let titles: Vec<_> = posts.iter().map(|p| p.scalar("title").unwrap().clone()).collect();
    assert_eq!(titles, vec![text("a"), text("b"), text("c")]);
    assert_eq!(posts[0].entity, "Post");
}

#[test]
fn outer_join_without_match_yields_empty_collection() {
    let registry = blog(postgres());
    let select = SelectQuery::new(&registry, "User", "user")
        .unwrap()
        .left_join_and_select("user.posts", "post")
        .build()
        .unwrap();
    let rows = vec![
        row(&[
            ("user_id", SqlValue::Int(1)),
            ("user_name", text("ann")),
            ("user_ipv6", SqlValue::Null),
            ("post_id", SqlValue::Null),
            ("post_title", SqlValue::Null),
            ("post_author_id", SqlValue::Null),
        ]),
        row(&[
            ("user_id", SqlValue::Int(2)),
            ("user_name", text("bob")),
            ("user_ipv6", SqlValue::Null),
            ("post_id", SqlValue::Int(5)),
            ("post_title", text("hello")),
            ("post_author_id", SqlValue::Int(2)),
        ]),
    ];
    let users = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap();
    assert_eq!(users.len(), 2);
    assert!(users[0].many("posts").is_empty());
    assert_eq!(users[1].many("posts").len(), 1);
}

#[test]
fn single_relations_hydrate_as_one() {
    let registry = blog(postgres());
    let select = SelectQuery::new(&registry, "Post", "post")
        .unwrap()
        .left_join_and_select("post.author", "author")
        .build()
        .unwrap();
    let rows = vec![row(&[
        ("post_id", SqlValue::Int(5)),
        ("post_title", text("hello")),
        ("post_author_id", SqlValue::Null),
        ("author_id", SqlValue::Null),
        ("author_name", SqlValue::Null),
        ("author_ipv6", SqlValue::Null),
    ])];
    let posts = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap();
    assert_eq!(posts[0].get("author"), Some(&FieldValue::One(None)));
}

#[test]
fn inet6_values_are_normalized() {
    let registry = blog(postgres());
    let select = SelectQuery::new(&registry, "User", "user").unwrap().build().unwrap();
    let rows = vec![row(&[
        ("user_id", SqlValue::Int(1)),
        ("user_name", text("ann")),
        ("user_ipv6", text("2001:0db8:0000:0000:0000:ff00:0042:8329")),
    ])];
    let users = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap();
    assert_eq!(users[0].scalar("ipv6"), Some(&text("2001:db8::ff00:42:8329")));
}

#[test]
fn discriminator_selects_the_subclass() {
    let registry = inheritance(postgres());
    let select = SelectQuery::new(&registry, "Content", "content").unwrap().build().unwrap();
    let labels: Vec<String> = select.plan.labels().map(String::from).collect();
    let rows: Vec<_> = [("Photo", 1), ("Video", 2)]
        .into_iter()
        .map(|(kind, id)| {
            labels
                .iter()
                .map(|label| {
                    let value = match label.as_str() {
                        "content_id" => SqlValue::Int(id),
                        "content_type" => text(kind),
                        "content_title" => text("t"),
                        _ => SqlValue::Null,
                    };
                    (label.clone(), value)
                })
                .collect()
        })
        .collect();
    let contents = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap();
    let kinds: Vec<&str> = contents.iter().map(|c| c.entity.as_str()).collect();
    assert_eq!(kinds, vec!["Photo", "Video"]);
}

#[test]
fn missing_label_is_an_error() {
    let registry = blog(postgres());
    let select = SelectQuery::new(&registry, "User", "user").unwrap().build().unwrap();
    let rows = vec![row(&[("user_id", SqlValue::Int(1))])];
    let err = Hydrator::new(&registry, &select.plan).hydrate(&rows).unwrap_err();
    assert_eq!(err, QueryError::MissingColumn("user_name".into()));
}

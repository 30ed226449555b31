//! Behaviour every storage backend must share. Each backend's test module
//! runs `run_all` against a fresh instance.

use chrono::{Duration, Utc};
use uuid::Uuid;
use crate::entities::{MediaType, NewComment, NewMedia, Project};
use crate::storage::Storage;

pub async fn run_all(storage: &dyn Storage) {
    created_project_is_empty(storage).await;
    listing_is_newest_first(storage).await;
    append_assigns_increasing_positions(storage).await;
    positions_are_reassigned_and_idempotent(storage).await;
    comments_are_added_and_removed(storage).await;
    delete_media_cascades_to_comments(storage).await;
    delete_project_cascades(storage).await;
    missing_parents_are_reported(storage).await;
    title_is_updated(storage).await;
}

fn new_image(name: &str) -> NewMedia {
    NewMedia {
        url: format!("http://localhost:3000/blobs/proofed/p/{name}.png"),
        blob_id: Some(format!("proofed/p/{name}")),
        kind: MediaType::Image,
    }
}

async fn created_project_is_empty(storage: &dyn Storage) {
    let project = Project::new("Launch Campaign".to_string());
    storage.insert_project(&project).await.unwrap();

    let stored = storage.get_project(&project.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Launch Campaign");
    assert!(stored.media.is_empty());
    assert_eq!(stored.created_at, project.created_at);
}

async fn listing_is_newest_first(storage: &dyn Storage) {
    let mut older = Project::new("older".to_string());
    older.created_at = Utc::now() + Duration::days(1);
    let mut newer = Project::new("newer".to_string());
    newer.created_at = Utc::now() + Duration::days(2);
    storage.insert_project(&older).await.unwrap();
    storage.insert_project(&newer).await.unwrap();
    storage.append_media(&newer.id, new_image("a")).await.unwrap().unwrap();

    let listing = storage.list_projects().await.unwrap();
    assert_eq!(listing[0].id, newer.id);
    assert_eq!(listing[0].media_count, 1);
    assert_eq!(listing[1].id, older.id);
    assert_eq!(listing[1].media_count, 0);
    let timestamps = listing.iter().map(|x| x.created_at).collect::<Vec<_>>();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
}

async fn append_assigns_increasing_positions(storage: &dyn Storage) {
    let project = Project::new("positions".to_string());
    storage.insert_project(&project).await.unwrap();

    let mut positions = vec![];
    for name in ["a", "b", "c"] {
        let media = storage.append_media(&project.id, new_image(name)).await.unwrap().unwrap();
        positions.push(media.position);
    }
    assert_eq!(positions, vec![0, 1, 2]);

    let stored = storage.get_project(&project.id).await.unwrap().unwrap();
    let urls = stored.media.iter().map(|x| x.url.clone()).collect::<Vec<_>>();
    assert!(urls[0].ends_with("a.png"));
    assert!(urls[2].ends_with("c.png"));
    assert_eq!(stored.media[1].blob_id.as_deref(), Some("proofed/p/b"));
}

async fn positions_are_reassigned_and_idempotent(storage: &dyn Storage) {
    let project = Project::new("reorder".to_string());
    storage.insert_project(&project).await.unwrap();
    let mut ids = vec![];
    for name in ["a", "b", "c"] {
        ids.push(storage.append_media(&project.id, new_image(name)).await.unwrap().unwrap().id);
    }

    let reversed = ids.iter().rev().enumerate().map(|(i, id)| (*id, i as i64)).collect::<Vec<_>>();
    assert!(storage.set_media_positions(&project.id, &reversed).await.unwrap());
    let first = storage.get_project(&project.id).await.unwrap().unwrap();
    assert!(storage.set_media_positions(&project.id, &reversed).await.unwrap());
    let second = storage.get_project(&project.id).await.unwrap().unwrap();

    let order = first.media.iter().map(|x| x.id).collect::<Vec<_>>();
    assert_eq!(order, ids.iter().rev().cloned().collect::<Vec<_>>());
    assert_eq!(first, second);

    // appending after a reorder continues past the maximum
    let appended = storage.append_media(&project.id, new_image("d")).await.unwrap().unwrap();
    assert_eq!(appended.position, 3);
}

async fn comments_are_added_and_removed(storage: &dyn Storage) {
    let project = Project::new("comments".to_string());
    storage.insert_project(&project).await.unwrap();
    let media = storage.append_media(&project.id, new_image("a")).await.unwrap().unwrap();

    let comment = NewComment { x: 12.5, y: 99.0, text: "fix logo".to_string(), author: None }.into_comment();
    assert!(storage.insert_comment(&project.id, &media.id, &comment).await.unwrap());

    let stored = storage.get_media(&project.id, &media.id).await.unwrap().unwrap();
    assert_eq!(stored.comments.len(), 1);
    assert_eq!(stored.comments[0].x, 12.5);
    assert_eq!(stored.comments[0].y, 99.0);
    assert_eq!(stored.comments[0].author, "Anonymous");

    assert!(storage.delete_comment(&project.id, &media.id, &comment.id).await.unwrap());
    assert!(!storage.delete_comment(&project.id, &media.id, &comment.id).await.unwrap());
    let stored = storage.get_media(&project.id, &media.id).await.unwrap().unwrap();
    assert!(stored.comments.is_empty());
}

async fn delete_media_cascades_to_comments(storage: &dyn Storage) {
    let project = Project::new("delete media".to_string());
    storage.insert_project(&project).await.unwrap();
    let kept = storage.append_media(&project.id, new_image("kept")).await.unwrap().unwrap();
    let removed = storage.append_media(&project.id, new_image("removed")).await.unwrap().unwrap();
    let comment = NewComment { x: 1.0, y: 2.0, text: "pin".to_string(), author: Some("Ana".to_string()) }.into_comment();
    assert!(storage.insert_comment(&project.id, &removed.id, &comment).await.unwrap());

    assert!(storage.delete_media(&project.id, &removed.id).await.unwrap());
    assert!(!storage.delete_media(&project.id, &removed.id).await.unwrap());
    assert!(storage.get_media(&project.id, &removed.id).await.unwrap().is_none());
    assert!(!storage.delete_comment(&project.id, &removed.id, &comment.id).await.unwrap());

    let stored = storage.get_project(&project.id).await.unwrap().unwrap();
    assert_eq!(stored.media.len(), 1);
    assert_eq!(stored.media[0].id, kept.id);
}

async fn delete_project_cascades(storage: &dyn Storage) {
    let project = Project::new("delete project".to_string());
    storage.insert_project(&project).await.unwrap();
    let media = storage.append_media(&project.id, new_image("a")).await.unwrap().unwrap();

    assert!(storage.delete_project(&project.id).await.unwrap());
    assert!(storage.get_project(&project.id).await.unwrap().is_none());
    assert!(storage.get_media(&project.id, &media.id).await.unwrap().is_none());
    assert!(!storage.delete_project(&project.id).await.unwrap());
    assert!(storage.list_projects().await.unwrap().iter().all(|x| x.id != project.id));
}

async fn missing_parents_are_reported(storage: &dyn Storage) {
    let unknown = Uuid::new_v4();
    assert!(storage.get_project(&unknown).await.unwrap().is_none());
    assert!(storage.append_media(&unknown, new_image("a")).await.unwrap().is_none());
    assert!(!storage.set_media_positions(&unknown, &[]).await.unwrap());
    assert!(!storage.update_project_title(&unknown, "x").await.unwrap());

    let project = Project::new("missing media".to_string());
    storage.insert_project(&project).await.unwrap();
    let comment = NewComment { x: 1.0, y: 1.0, text: "pin".to_string(), author: None }.into_comment();
    assert!(!storage.insert_comment(&project.id, &unknown, &comment).await.unwrap());
    assert!(!storage.delete_media(&project.id, &unknown).await.unwrap());
}

async fn title_is_updated(storage: &dyn Storage) {
    let project = Project::new("draft".to_string());
    storage.insert_project(&project).await.unwrap();
    assert!(storage.update_project_title(&project.id, "final").await.unwrap());
    let stored = storage.get_project(&project.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "final");
}

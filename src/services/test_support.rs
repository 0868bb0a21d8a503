use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::{
        models::QuestionEntity,
        quiz_store::{QuizStore, memory::InMemoryQuizStore},
    },
    dto::quiz_match::SubmitAnswerRequest,
    services::answer_service::submit_answer,
    state::{
        SharedState,
        quiz_match::{PlayerRef, QUESTIONS_PER_MATCH},
    },
};

pub fn player(id: &str) -> PlayerRef {
    PlayerRef {
        id: id.into(),
        login: format!("{id}-login"),
    }
}

pub fn answer(text: &str) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        answer: text.into(),
        request_id: None,
    }
}

/// Insert `count` published questions whose only accepted answer is `right`.
pub async fn seed_questions(store: &InMemoryQuizStore, count: usize) {
    for i in 0..count {
        store
            .insert_question(QuestionEntity {
                id: Uuid::new_v4(),
                body: format!("Seeded question number {i}"),
                correct_answers: vec!["right".into()],
                published: true,
                created_at: SystemTime::now(),
                updated_at: None,
                deleted_at: None,
            })
            .await
            .unwrap();
    }
}

/// Play an active match to the end, both players answering `right` to everything.
pub async fn finish_match(state: &SharedState, id: Uuid) {
    let store = state.require_quiz_store().await.unwrap();
    let entity = store.find_match(id).await.unwrap().unwrap();
    for progress in &entity.players {
        for _ in progress.answers.len()..QUESTIONS_PER_MATCH {
            submit_answer(state, &progress.player_id, answer("right"))
                .await
                .unwrap();
        }
    }
}

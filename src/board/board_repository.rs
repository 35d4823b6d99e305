use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::board_models::{Board, BoardAssignment};
use crate::error::{AppError, Result};

#[async_trait]
pub trait BoardRepositoryTrait: Send + Sync {
    async fn create(&self, owner_id: Uuid) -> Result<Board>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Board>>;
    /// Newest first.
    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Board>>;
    /// Deactivate the board's current assignment and insert an active one for
    /// `target_id`, as a single unit with respect to other reassigns of the
    /// same board.
    async fn reassign(&self, board_id: Uuid, target_id: Uuid) -> Result<BoardAssignment>;
    async fn find_active_assignment(&self, board_id: Uuid) -> Result<Option<BoardAssignment>>;
    /// Full history, newest first.
    async fn find_assignments(&self, board_id: Uuid) -> Result<Vec<BoardAssignment>>;
    async fn increment_scan_count(&self, board_id: Uuid) -> Result<()>;
}

// Stamped with clock_timestamp() while the board row is locked, so history
// order follows lock order rather than transaction start time.
const INSERT_ACTIVE_ASSIGNMENT: &str = "INSERT INTO board_assignments (board_id, target_id, is_active, assigned_at)
     VALUES ($1, $2, true, clock_timestamp())
     RETURNING *";

const SELECT_ASSIGNMENT_HISTORY: &str = "SELECT * FROM board_assignments WHERE board_id = $1
     ORDER BY assigned_at DESC, is_active DESC";

#[derive(Clone)]
pub struct BoardRepository {
    pool: PgPool,
}

impl BoardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardRepositoryTrait for BoardRepository {
    async fn create(&self, owner_id: Uuid) -> Result<Board> {
        let board = sqlx::query_as::<_, Board>(
            "INSERT INTO qr_boards (owner_id) VALUES ($1) RETURNING *",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(board)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Board>> {
        let board = sqlx::query_as::<_, Board>("SELECT * FROM qr_boards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(board)
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Board>> {
        let boards = sqlx::query_as::<_, Board>(
            "SELECT * FROM qr_boards WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(boards)
    }

    async fn reassign(&self, board_id: Uuid, target_id: Uuid) -> Result<BoardAssignment> {
        let mut tx = self.pool.begin().await?;

        // row lock serialises reassigns of this board until commit
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM qr_boards WHERE id = $1 FOR UPDATE")
                .bind(board_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Board not found".to_string()));
        }

        sqlx::query(
            "UPDATE board_assignments SET is_active = false WHERE board_id = $1 AND is_active",
        )
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

        let assignment = sqlx::query_as::<_, BoardAssignment>(INSERT_ACTIVE_ASSIGNMENT)
            .bind(board_id)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(assignment)
    }

    async fn find_active_assignment(&self, board_id: Uuid) -> Result<Option<BoardAssignment>> {
        let assignment = sqlx::query_as::<_, BoardAssignment>(
            "SELECT * FROM board_assignments WHERE board_id = $1 AND is_active",
        )
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn find_assignments(&self, board_id: Uuid) -> Result<Vec<BoardAssignment>> {
        let assignments = sqlx::query_as::<_, BoardAssignment>(SELECT_ASSIGNMENT_HISTORY)
            .bind(board_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(assignments)
    }

    async fn increment_scan_count(&self, board_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE qr_boards SET scan_count = scan_count + 1 WHERE id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

struct BoardSlot {
    board: Board,
    scan_count: AtomicI64,
    // the per-board lock for reassignment; history in insertion order
    assignments: Mutex<Vec<BoardAssignment>>,
}

impl BoardSlot {
    fn snapshot(&self) -> Board {
        Board {
            scan_count: self.scan_count.load(Ordering::Relaxed),
            ..self.board.clone()
        }
    }

    fn assignments(&self) -> Result<std::sync::MutexGuard<'_, Vec<BoardAssignment>>> {
        self.assignments.lock().map_err(|_| AppError::InternalError)
    }
}

#[derive(Default)]
pub struct InMemoryBoardRepository {
    boards: DashMap<Uuid, Arc<BoardSlot>>,
}

impl InMemoryBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, board_id: &Uuid) -> Option<Arc<BoardSlot>> {
        self.boards.get(board_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl BoardRepositoryTrait for InMemoryBoardRepository {
    async fn create(&self, owner_id: Uuid) -> Result<Board> {
        let board = Board {
            id: Uuid::new_v4(),
            owner_id,
            scan_count: 0,
            created_at: Utc::now(),
        };

        self.boards.insert(
            board.id,
            Arc::new(BoardSlot {
                board: board.clone(),
                scan_count: AtomicI64::new(0),
                assignments: Mutex::new(Vec::new()),
            }),
        );

        Ok(board)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Board>> {
        Ok(self.slot(&id).map(|slot| slot.snapshot()))
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> Result<Vec<Board>> {
        let mut boards: Vec<Board> = self
            .boards
            .iter()
            .filter(|entry| entry.value().board.owner_id == owner_id)
            .map(|entry| entry.value().snapshot())
            .collect();
        boards.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(boards)
    }

    async fn reassign(&self, board_id: Uuid, target_id: Uuid) -> Result<BoardAssignment> {
        let slot = self
            .slot(&board_id)
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))?;

        let mut assignments = slot.assignments()?;
        for assignment in assignments.iter_mut().filter(|a| a.is_active) {
            assignment.is_active = false;
        }

        let assignment = BoardAssignment {
            id: Uuid::new_v4(),
            board_id,
            target_id,
            is_active: true,
            assigned_at: Utc::now(),
        };
        assignments.push(assignment.clone());

        Ok(assignment)
    }

    async fn find_active_assignment(&self, board_id: Uuid) -> Result<Option<BoardAssignment>> {
        let Some(slot) = self.slot(&board_id) else {
            return Ok(None);
        };
        let assignments = slot.assignments()?;
        Ok(assignments.iter().find(|a| a.is_active).cloned())
    }

    async fn find_assignments(&self, board_id: Uuid) -> Result<Vec<BoardAssignment>> {
        let Some(slot) = self.slot(&board_id) else {
            return Ok(Vec::new());
        };
        let assignments = slot.assignments()?;
        Ok(assignments.iter().rev().cloned().collect())
    }

    async fn increment_scan_count(&self, board_id: Uuid) -> Result<()> {
        if let Some(slot) = self.slot(&board_id) {
            slot.scan_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

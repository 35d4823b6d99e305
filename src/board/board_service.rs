use std::sync::Arc;
use uuid::Uuid;

use super::board_dto::BoardResponse;
use super::board_models::{Board, BoardAssignment, ScanTarget};
use super::board_repository::BoardRepositoryTrait;
use super::target_repository::TargetRepositoryTrait;
use crate::error::{AppError, Result};
use crate::notification::{NotificationCategory, NotificationService};

/// Board assignment engine.
///
/// Concurrent reassigns of one board are serialised by the repository;
/// whichever commits last is the active target, and every caller gets its
/// own assignment back without a conflict error.
#[derive(Clone)]
pub struct BoardService {
    boards: Arc<dyn BoardRepositoryTrait>,
    targets: Arc<dyn TargetRepositoryTrait>,
    notifications: NotificationService,
    frontend_url: Arc<str>,
}

impl BoardService {
    pub fn new(
        boards: Arc<dyn BoardRepositoryTrait>,
        targets: Arc<dyn TargetRepositoryTrait>,
        notifications: NotificationService,
        frontend_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            boards,
            targets,
            notifications,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn create_board(&self, owner_id: Uuid) -> Result<Board> {
        let board = self.boards.create(owner_id).await?;
        tracing::info!(board_id = %board.id, %owner_id, "Board created");
        Ok(board)
    }

    pub async fn list_boards(&self, owner_id: Uuid) -> Result<Vec<BoardResponse>> {
        let boards = self.boards.find_all_by_owner(owner_id).await?;

        let mut responses = Vec::with_capacity(boards.len());
        for board in boards {
            responses.push(self.describe(board).await?);
        }
        Ok(responses)
    }

    /// Owner-only detail view; other callers see `NotFound`.
    pub async fn get_board(&self, board_id: Uuid, requester_id: Uuid) -> Result<BoardResponse> {
        let board = self
            .boards
            .find_by_id(board_id)
            .await?
            .filter(|board| board.owner_id == requester_id)
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))?;

        self.describe(board).await
    }

    pub async fn reassign(
        &self,
        board_id: Uuid,
        target_id: Uuid,
        requester_id: Uuid,
    ) -> Result<BoardAssignment> {
        let board = self
            .boards
            .find_by_id(board_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))?;
        if board.owner_id != requester_id {
            return Err(AppError::NotOwned("Board is not yours".to_string()));
        }

        let target = self
            .targets
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Target not found".to_string()))?;
        if target.owner_id != requester_id {
            return Err(AppError::NotOwned("Target is not yours".to_string()));
        }

        let assignment = self.boards.reassign(board_id, target_id).await?;
        tracing::info!(%board_id, %target_id, assignment_id = %assignment.id, "Board reassigned");

        if let Err(e) = self
            .notifications
            .create(
                board.owner_id,
                "Board reassigned",
                &format!("Board {} now points to {}.", board_id, target_id),
                NotificationCategory::System,
            )
            .await
        {
            tracing::warn!(%board_id, "Failed to record reassignment notification: {:?}", e);
        }

        Ok(assignment)
    }

    /// Current target of the board, `None` if it has never been assigned.
    pub async fn get_active_target(&self, board_id: Uuid) -> Result<Option<Uuid>> {
        if self.boards.find_by_id(board_id).await?.is_none() {
            return Err(AppError::NotFound("Board not found".to_string()));
        }

        self.active_target_of(board_id).await
    }

    /// Owner-scoped [`get_active_target`](Self::get_active_target); other
    /// callers see `NotFound`, as with [`get_board`](Self::get_board).
    pub async fn get_active_target_for(
        &self,
        board_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<Uuid>> {
        self.boards
            .find_by_id(board_id)
            .await?
            .filter(|board| board.owner_id == requester_id)
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))?;

        self.active_target_of(board_id).await
    }

    /// Record the owning service's assertion that `target_id` exists and
    /// belongs to `owner_id`.
    pub async fn register_target(&self, target_id: Uuid, owner_id: Uuid) -> Result<ScanTarget> {
        let target = self.targets.upsert(target_id, owner_id).await?;
        if target.owner_id != owner_id {
            return Err(AppError::NotOwned("Target is not yours".to_string()));
        }
        Ok(target)
    }

    pub async fn get_target(&self, target_id: Uuid, requester_id: Uuid) -> Result<ScanTarget> {
        self.targets
            .find_by_id(target_id)
            .await?
            .filter(|target| target.owner_id == requester_id)
            .ok_or_else(|| AppError::NotFound("Target not found".to_string()))
    }

    async fn active_target_of(&self, board_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .boards
            .find_active_assignment(board_id)
            .await?
            .map(|assignment| assignment.target_id))
    }

    async fn describe(&self, board: Board) -> Result<BoardResponse> {
        let assignments = self.boards.find_assignments(board.id).await?;
        Ok(BoardResponse::new(board, assignments, &self.frontend_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::board_repository::InMemoryBoardRepository;
    use crate::board::target_repository::InMemoryTargetRepository;
    use crate::dispatch::Dispatcher;
    use crate::notification::InMemoryNotificationRepository;

    struct Fixture {
        service: BoardService,
        boards: Arc<InMemoryBoardRepository>,
        notifications: NotificationService,
    }

    fn fixture() -> Fixture {
        let boards = Arc::new(InMemoryBoardRepository::new());
        let notifications = NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            Dispatcher::disabled(),
        );
        let service = BoardService::new(
            boards.clone(),
            Arc::new(InMemoryTargetRepository::new()),
            notifications.clone(),
            "http://localhost:3000",
        );
        Fixture {
            service,
            boards,
            notifications,
        }
    }

    async fn active_count(boards: &InMemoryBoardRepository, board_id: Uuid) -> usize {
        boards
            .find_assignments(board_id)
            .await
            .unwrap()
            .iter()
            .filter(|a| a.is_active)
            .count()
    }

    #[tokio::test]
    async fn test_new_board_is_unassigned() {
        let f = fixture();
        let owner = Uuid::new_v4();

        let board = f.service.create_board(owner).await.unwrap();

        assert_eq!(board.scan_count, 0);
        assert_eq!(board.owner_id, owner);
        assert_eq!(f.service.get_active_target(board.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reassign_keeps_history() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        f.service.register_target(p1, owner).await.unwrap();
        f.service.register_target(p2, owner).await.unwrap();
        let board = f.service.create_board(owner).await.unwrap();

        f.service.reassign(board.id, p1, owner).await.unwrap();
        assert_eq!(f.service.get_active_target(board.id).await.unwrap(), Some(p1));

        f.service.reassign(board.id, p2, owner).await.unwrap();
        assert_eq!(f.service.get_active_target(board.id).await.unwrap(), Some(p2));

        let history = f.boards.find_assignments(board.id).await.unwrap();
        assert_eq!(history.len(), 2);
        let old = history.iter().find(|a| a.target_id == p1).unwrap();
        assert!(!old.is_active);
        assert_eq!(active_count(&f.boards, board.id).await, 1);

        let detail = f.service.get_board(board.id, owner).await.unwrap();
        assert_eq!(detail.active_target_id, Some(p2));
        assert_eq!(detail.assignments[0].target_id, p2);
        assert_eq!(detail.scan_url, format!("http://localhost:3000/scan/{}/", board.id));
    }

    #[tokio::test]
    async fn test_reassign_records_system_notification() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        f.service.register_target(target, owner).await.unwrap();
        let board = f.service.create_board(owner).await.unwrap();

        f.service.reassign(board.id, target, owner).await.unwrap();

        let listed = f.notifications.list(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].category, NotificationCategory::System);
    }

    #[tokio::test]
    async fn test_reassign_rejects_other_owners() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let own_target = Uuid::new_v4();
        let foreign_target = Uuid::new_v4();
        f.service.register_target(own_target, owner).await.unwrap();
        f.service.register_target(foreign_target, stranger).await.unwrap();
        let board = f.service.create_board(owner).await.unwrap();

        assert!(matches!(
            f.service.reassign(board.id, own_target, stranger).await,
            Err(AppError::NotOwned(_))
        ));
        assert!(matches!(
            f.service.reassign(board.id, foreign_target, owner).await,
            Err(AppError::NotOwned(_))
        ));
        assert_eq!(f.service.get_active_target(board.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reassign_unknown_board_or_target() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        f.service.register_target(target, owner).await.unwrap();
        let board = f.service.create_board(owner).await.unwrap();

        assert!(matches!(
            f.service.reassign(Uuid::new_v4(), target, owner).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.reassign(board.id, Uuid::new_v4(), owner).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get_active_target(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reassign_leaves_exactly_one_active() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        f.service.register_target(a, owner).await.unwrap();
        f.service.register_target(b, owner).await.unwrap();
        let board = f.service.create_board(owner).await.unwrap();

        let first = tokio::spawn({
            let service = f.service.clone();
            async move { service.reassign(board.id, a, owner).await }
        });
        let second = tokio::spawn({
            let service = f.service.clone();
            async move { service.reassign(board.id, b, owner).await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let active = f.service.get_active_target(board.id).await.unwrap().unwrap();
        assert!(active == a || active == b);
        assert_eq!(active_count(&f.boards, board.id).await, 1);
        assert_eq!(f.boards.find_assignments(board.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reassign_storm_never_breaks_invariant() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let board = f.service.create_board(owner).await.unwrap();
        let mut targets = Vec::new();
        for _ in 0..8 {
            let target = Uuid::new_v4();
            f.service.register_target(target, owner).await.unwrap();
            targets.push(target);
        }

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let service = f.service.clone();
                let boards = f.boards.clone();
                let target = targets[i % targets.len()];
                tokio::spawn(async move {
                    service.reassign(board.id, target, owner).await.unwrap();
                    active_count(&boards, board.id).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(f.boards.find_assignments(board.id).await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_register_target_is_owner_scoped() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();

        f.service.register_target(target, owner).await.unwrap();
        f.service.register_target(target, owner).await.unwrap();

        assert!(matches!(
            f.service.register_target(target, Uuid::new_v4()).await,
            Err(AppError::NotOwned(_))
        ));
        assert!(f.service.get_target(target, owner).await.is_ok());
        assert!(matches!(
            f.service.get_target(target, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_board_hides_foreign_boards() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let board = f.service.create_board(owner).await.unwrap();
        f.service.create_board(Uuid::new_v4()).await.unwrap();

        assert!(matches!(
            f.service.get_board(board.id, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        let listed = f.service.list_boards(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, board.id);
    }

    #[tokio::test]
    async fn test_active_target_is_owner_scoped() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let board = f.service.create_board(owner).await.unwrap();
        f.service.register_target(target, owner).await.unwrap();
        f.service.reassign(board.id, target, owner).await.unwrap();

        assert_eq!(
            f.service.get_active_target_for(board.id, owner).await.unwrap(),
            Some(target)
        );
        assert!(matches!(
            f.service.get_active_target_for(board.id, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get_active_target_for(Uuid::new_v4(), owner).await,
            Err(AppError::NotFound(_))
        ));
    }
}

pub mod board_dto;
pub mod board_handlers;
pub mod board_models;
pub mod board_repository;
pub mod board_service;
pub mod routes;
pub mod target_repository;

pub use board_repository::{BoardRepository, BoardRepositoryTrait, InMemoryBoardRepository};
pub use board_service::BoardService;
pub use target_repository::{InMemoryTargetRepository, TargetRepository, TargetRepositoryTrait};

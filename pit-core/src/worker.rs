use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::ExchangeError;
use crate::game::Game;
use crate::types::{Asset, OrderId, OrderResult, Price, Side, UserId, Volume};

/// Commands a book's writer thread accepts. Each carries its own reply
/// channel so transport threads can wait for the result.
pub enum BookCommand {
    Register {
        user_id: UserId,
        cash: u32,
        assets: u32,
        reply: Sender<()>,
    },
    Place {
        side: Side,
        user_id: UserId,
        price: Price,
        volume: Volume,
        reply: Sender<Result<OrderResult, ExchangeError>>,
    },
    Cancel {
        order_id: OrderId,
        reply: Sender<Result<(), ExchangeError>>,
    },
}

/// BookHandle submits write operations to one book's writer thread and
/// waits for the reply. Cloneable; the worker exits once every handle
/// for its book is dropped.
#[derive(Clone)]
pub struct BookHandle {
    asset: Asset,
    commands: Sender<BookCommand>,
}

impl BookHandle {
    /// The asset whose book this handle drives.
    #[inline(always)]
    pub fn asset(&self) -> Asset {
        self.asset
    }

    /// Registers a user on this book.
    pub fn register(&self, user_id: UserId, cash: u32, assets: u32) {
        let (reply, result) = channel::bounded(1);
        self.send(BookCommand::Register {
            user_id,
            cash,
            assets,
            reply,
        });
        result.recv().expect("book worker terminated");
    }

    /// Places a limit order on this book.
    pub fn place(
        &self,
        side: Side,
        user_id: UserId,
        price: Price,
        volume: Volume,
    ) -> Result<OrderResult, ExchangeError> {
        let (reply, result) = channel::bounded(1);
        self.send(BookCommand::Place {
            side,
            user_id,
            price,
            volume,
            reply,
        });
        result.recv().expect("book worker terminated")
    }

    /// Cancels a resting order on this book.
    pub fn cancel(&self, order_id: OrderId) -> Result<(), ExchangeError> {
        let (reply, result) = channel::bounded(1);
        self.send(BookCommand::Cancel { order_id, reply });
        result.recv().expect("book worker terminated")
    }

    fn send(&self, command: BookCommand) {
        self.commands
            .send(command)
            .expect("book worker terminated");
    }
}

/// Spawns one writer thread per asset book and returns their handles in
/// asset order. All writes to a book flow through its worker, which is
/// what makes writes on one book totally ordered.
pub fn spawn_workers(game: &Arc<Game>) -> Vec<BookHandle> {
    Asset::ALL
        .iter()
        .map(|&asset| {
            let (commands, inbox) = channel::unbounded();
            let game = Arc::clone(game);
            thread::Builder::new()
                .name(format!("book-{}", asset.route_name()))
                .spawn(move || run_worker(&game, asset, &inbox))
                .expect("failed to spawn book worker");
            BookHandle { asset, commands }
        })
        .collect()
}

fn run_worker(game: &Game, asset: Asset, inbox: &Receiver<BookCommand>) {
    let book = game.book(asset);
    while let Ok(command) = inbox.recv() {
        match command {
            BookCommand::Register {
                user_id,
                cash,
                assets,
                reply,
            } => {
                book.register(user_id, cash, assets);
                let _ = reply.send(());
            }
            BookCommand::Place {
                side,
                user_id,
                price,
                volume,
                reply,
            } => {
                let _ = reply.send(book.place(side, user_id, price, volume));
            }
            BookCommand::Cancel { order_id, reply } => {
                let _ = reply.send(book.cancel(order_id));
            }
        }
    }
    tracing::debug!(asset = %asset, "book worker shutting down");
}

//! Support domain module (event-sourced).

pub mod ticket;

pub use ticket::{
    AssignTicket, ChangeTicketPriority, CloseTicket, MessageAuthor, OpenTicket, ReplyToTicket,
    ResolveTicket, SupportTicket, TicketAssigned, TicketClosed, TicketCommand, TicketEvent,
    TicketId, TicketMessage, TicketOpened, TicketPriority, TicketPriorityChanged, TicketReplied,
    TicketReopened, TicketResolved, TicketStatus,
};

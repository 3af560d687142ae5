extern crate imap_engine;

use imap_engine::{Session, StreamTransport};

fn main() {
    let transport = StreamTransport::connect_tls("imap.gmail.com", 993).unwrap();
    let mut imap_socket = Session::new(transport).unwrap();

    if !imap_socket.login("username", "password").unwrap() {
        println!("Login refused: {}", imap_socket.error_text());
        return;
    }

    for (capability, value) in imap_socket.capabilities().iter() {
        println!("{} {:?}", capability, value);
    }

    match imap_socket.select("INBOX") {
        Ok(true) => println!("{}", imap_socket.responses().mailbox()),
        Ok(false) => println!("Error selecting INBOX: {}", imap_socket.error_text()),
        Err(e) => println!("Error selecting INBOX: {}", e),
    };

    match imap_socket.fetch("2", "body[text]") {
        Ok(_) => {
            for fetch in &imap_socket.responses().fetch {
                match fetch.parse() {
                    Ok(items) => print!("{}", items.text().unwrap_or("")),
                    Err(e) => println!("Error parsing email {}: {}", fetch.message, e),
                }
            }
        }
        Err(e) => println!("Error Fetching email 2: {}", e),
    };

    imap_socket.logout().unwrap();
}

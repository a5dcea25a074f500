use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::{CSS, VarMap, var};

pub(super) fn render(vars: &VarMap) -> Markup {
    let title = var(vars, "title", "Chat relay");
    let ws_path = var(vars, "ws_path", "/ws");

    html! {
        (DOCTYPE)
        html {
            head {
                title { (title) }
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                style { (PreEscaped(CSS)) }
            }
            body data-ws-path=(ws_path) {
                div class="container" {
                    h1 { (title) }
                    div id="status" class="status offline" { "Not connected" }

                    div class="layout" {
                        div class="card" {
                            label for="username" { "Username" }
                            input type="text" id="username" autocomplete="off";

                            label for="message" { "Message" }
                            input type="text" id="message" autocomplete="off";

                            button id="send-btn" { "Send message" }

                            div id="output" {}
                        }

                        div class="card" {
                            h3 { "Who's online" }
                            ul id="online-users" {}
                        }
                    }
                }

                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

const JAVASCRIPT: &str = r#"
(function () {
    const wsPath = document.body.dataset.wsPath;
    const scheme = location.protocol === 'https:' ? 'wss' : 'ws';
    const socket = new WebSocket(`${scheme}://${location.host}${wsPath}`);

    const status = document.getElementById('status');
    const output = document.getElementById('output');
    const users = document.getElementById('online-users');
    const usernameField = document.getElementById('username');
    const messageField = document.getElementById('message');

    function send(action, message) {
        if (socket.readyState !== WebSocket.OPEN) return;
        socket.send(JSON.stringify({
            action: action,
            username: usernameField.value,
            message: message || '',
        }));
    }

    function appendLine(text) {
        const line = document.createElement('div');
        line.textContent = text;
        output.appendChild(line);
        output.scrollTop = output.scrollHeight;
    }

    socket.onopen = () => {
        status.textContent = 'Connected';
        status.className = 'status online';
    };

    socket.onclose = () => {
        status.textContent = 'Disconnected';
        status.className = 'status offline';
    };

    socket.onmessage = (event) => {
        const data = JSON.parse(event.data);
        switch (data.action) {
            case 'list_users':
                users.replaceChildren();
                (data.connected_users || []).forEach((name) => {
                    const item = document.createElement('li');
                    item.textContent = name;
                    users.appendChild(item);
                });
                break;
            case 'broadcast':
                appendLine(data.message);
                break;
        }
    };

    usernameField.addEventListener('change', () => send('username'));

    function sendMessage() {
        if (usernameField.value === '' || messageField.value === '') {
            appendLine('Fill in a username and a message first.');
            return;
        }
        send('broadcast', messageField.value);
        messageField.value = '';
    }

    document.getElementById('send-btn').addEventListener('click', (e) => {
        e.preventDefault();
        sendMessage();
    });

    messageField.addEventListener('keydown', (e) => {
        if (e.key === 'Enter') {
            e.preventDefault();
            sendMessage();
        }
    });

    window.addEventListener('beforeunload', () => send('left'));
})();
"#;

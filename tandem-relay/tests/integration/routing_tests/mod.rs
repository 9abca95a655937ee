mod test_cursor_forwarding;

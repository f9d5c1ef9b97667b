mod test_ws_roundtrip;
